//! Incrementally update a graph

use anyhow::{Context, Result};
use cli_lib::config::{self, ProjectConfig};
use engine::{ChangedFailurePolicy, OutlineAnalyzer, UpdateDriver, UpdateOutcome, UpdateReport};
use gl_core::JsonGraphStore;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Command-line values overriding the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub force_full: bool,
    pub workers: Option<usize>,
    pub policy: Option<ChangedFailurePolicy>,
}

pub fn run(
    graph: &Path,
    root: &Path,
    overrides: Overrides,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    // 1. Resolve configuration
    let (config, _) = config::resolve(config_path, Some(root))?;
    let mut options = config.update_options(root);
    options.force_full = overrides.force_full;
    if let Some(workers) = overrides.workers {
        options.workers = workers;
    }
    if let Some(policy) = overrides.policy {
        options.policy = policy;
    }

    // 2. Run the update
    let store = JsonGraphStore::new();
    let analyzer = OutlineAnalyzer::new(root);
    let driver = UpdateDriver::new(&store, &analyzer, options);

    let progress = progress_bar(quiet);
    let outcome = driver
        .update_with_progress(graph, root, &|path| {
            progress.inc(1);
            progress.set_message(path.to_string());
        })
        .with_context(|| format!("Failed to update {}", graph.display()));
    progress.finish_and_clear();
    let outcome = outcome?;

    // 3. Report
    if !quiet {
        print_outcome(&outcome, &config);
    }
    Ok(())
}

/// Spinner counting recomputed files (hidden when quiet)
pub fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {pos} files analyzed {wide_msg:.dim}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Print a run summary in the terminal style of the other commands
pub fn print_outcome(outcome: &UpdateOutcome, config: &ProjectConfig) {
    let report = UpdateReport::new(outcome).with_error_limit(config.update.error_report_limit);
    let counts = outcome.changes.counts();

    let headline = if outcome.errors.is_empty() {
        "Graph updated".green().bold().to_string()
    } else {
        "Graph updated with errors".yellow().bold().to_string()
    };
    println!("{}  {}", headline, report.summary_line().dimmed());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Output:        {}", outcome.graph_path.display().to_string().cyan());
    println!("Mode:          {}", outcome.mode.label());
    if let Some(cause) = &outcome.fallback_cause {
        println!("Fallback:      {}", cause.yellow());
    }
    println!();

    println!("Files:");
    println!("  Changed:     {}", counts.changed.to_string().yellow());
    println!("  New:         {}", counts.new.to_string().green());
    println!("  Deleted:     {}", counts.deleted.to_string().red());
    println!("  Unchanged:   {}", counts.unchanged.to_string().dimmed());
    println!();

    println!("Graph:");
    println!("  Facts:       {}", outcome.fact_count);
    println!("  Files:       {}", outcome.owner_count);
    println!(
        "  Retracted:   {}  Inserted: {}  Restored: {}",
        outcome.stats.retracted, outcome.stats.inserted, outcome.stats.restored
    );

    if !outcome.orphans.is_empty() {
        println!();
        println!(
            "{} {} graph owners are not in the project and were kept:",
            "Warning:".yellow(),
            outcome.orphans.len()
        );
        for path in outcome.orphans.iter().take(5) {
            println!("    - {}", path);
        }
        if outcome.orphans.len() > 5 {
            println!("    ... and {} more", outcome.orphans.len() - 5);
        }
        println!("  {}", "Tip: 'gl build' rebuilds the graph without them".dimmed());
    }

    if !outcome.skipped.is_empty() {
        println!();
        println!("{} {} paths skipped:", "Warning:".yellow(), outcome.skipped.len());
        for (path, reason) in &outcome.skipped {
            println!("    - {}: {}", path.display(), reason.dimmed());
        }
    }

    if !outcome.errors.is_empty() {
        println!();
        println!("{} {}", "Errors:".red().bold(), outcome.errors.len());
        for error in report.shown_errors() {
            println!("    - {}: {}", error.path, error.reason.red());
        }
        let hidden = report.hidden_errors();
        if hidden > 0 {
            println!("    +{} more", hidden);
        }
    }
}
