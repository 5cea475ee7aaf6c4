//! Configuration inspection command
//!
//! Shows which file supplies the effective configuration and what it says.

use anyhow::{Context, Result};
use cli_lib::config::{self, ConfigSource, PROJECT_CONFIG_FILE};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

fn project_root(root: Option<&Path>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root.to_path_buf()),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "[]".dimmed().to_string()
    } else {
        format!("{:?}", values)
    }
}

/// List all effective configuration values
pub fn run_list(config_path: Option<&Path>, root: Option<&Path>) -> Result<()> {
    let root = project_root(root)?;
    let (config, source) = config::resolve(config_path, Some(&root))?;

    println!("{}", "Effective Configuration".bold());
    println!("{}: {}\n", "Source".dimmed(), source.to_string().dimmed());

    println!("{}", "[scan]".yellow());
    println!(
        "  {} = {} {}",
        "include".cyan(),
        list_or_none(&config.scan.include),
        if config.scan.include.is_empty() {
            "(all files)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "  {} = {}",
        "fingerprint".cyan(),
        format!("{:?}", config.scan.fingerprint).to_lowercase()
    );
    println!("  {} = {}", "use_gitignore".cyan(), config.scan.use_gitignore);
    println!("  {} = {}", "use_glignore".cyan(), config.scan.use_glignore);
    println!(
        "  {} = {}",
        "additional_patterns".cyan(),
        list_or_none(&config.scan.additional_patterns)
    );

    println!("\n{}", "[update]".yellow());
    println!(
        "  {} = {} {}",
        "workers".cyan(),
        config.update.workers,
        if config.update.workers == 0 {
            "(one per CPU)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!("  {} = {}", "changed_failure".cyan(), config.update.changed_failure);
    println!(
        "  {} = {}",
        "error_report_limit".cyan(),
        config.update.error_report_limit
    );

    println!("\n{}", "[history]".yellow());
    println!("  {} = {}", "retain_runs".cyan(), config.history.retain_runs);
    println!("  {} = {}", "track_files".cyan(), config.history.track_files);

    println!("\n{}", "[project]".yellow());
    println!(
        "  {} = {}",
        "name".cyan(),
        config
            .project
            .name
            .as_deref()
            .unwrap_or("(root directory name)")
    );
    println!(
        "  {} = {}",
        "version".cyan(),
        config.project.version.as_deref().unwrap_or("(none)")
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  workers: 0-256 (0 = one per CPU)");
    println!("  error_report_limit: 1-1000");
    println!("  retain_runs: 1-10,000");
    println!("  changed_failure: drop | restore");

    Ok(())
}

/// Show the config file in effect, or where one would be read from
pub fn run_path(config_path: Option<&Path>, root: Option<&Path>) -> Result<()> {
    let root = project_root(root)?;
    let (_, source) = config::resolve(config_path, Some(&root))?;

    match source {
        ConfigSource::Defaults => {
            println!("{}", root.join(PROJECT_CONFIG_FILE).display());
            println!(
                "{}",
                "File does not exist. Use 'gl config --example' for a starting point.".yellow()
            );
        }
        other => {
            if let Some(path) = other.path() {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}
