//! Show what the next update would do

use anyhow::{Context, Result};
use cli_lib::{config, util};
use engine::{OutlineAnalyzer, RunMode, UpdateDriver};
use gl_core::JsonGraphStore;
use owo_colors::OwoColorize;
use std::path::Path;
use watcher::ChangeKind;

pub fn run(graph: &Path, root: &Path, config_path: Option<&Path>) -> Result<()> {
    // 1. Resolve configuration
    let (config, source) = config::resolve(config_path, Some(root))?;

    // 2. Classify changes without recomputing
    let store = JsonGraphStore::new();
    let analyzer = OutlineAnalyzer::new(root);
    let driver = UpdateDriver::new(&store, &analyzer, config.update_options(root));
    let plan = driver
        .plan(graph, root)
        .with_context(|| format!("Failed to inspect {}", graph.display()))?;
    let counts = plan.changes.counts();

    // 3. Display output
    println!("{}", "Graph Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Graph:         {}", graph.display().to_string().cyan());
    println!("Project:       {}", root.display());
    println!("Config:        {}", source.to_string().dimmed());
    println!();

    print!("Last update:   ");
    match plan.previous_run {
        Some(ts) => {
            let ms = ts.timestamp_millis();
            println!(
                "{} ({})",
                util::format_relative_time(ms),
                util::format_absolute_time(ms).dimmed()
            );
        }
        None => println!("{}", "never".dimmed()),
    }

    print!("Next run:      ");
    match plan.mode {
        RunMode::Incremental => println!("{}", "incremental".green()),
        other => println!("{}", other.label().yellow()),
    }
    if plan.mode.is_full() {
        println!("  {}", "(recomputes every file)".dimmed());
    }
    if let Some(cause) = &plan.fallback_cause {
        println!("  Reason:      {}", cause.dimmed());
    }
    println!();

    println!("Pending:");
    println!("  Changed:     {}", counts.changed.to_string().yellow());
    println!("  New:         {}", counts.new.to_string().green());
    println!("  Deleted:     {}", counts.deleted.to_string().red());
    println!("  Unchanged:   {}", counts.unchanged.to_string().dimmed());

    let touched: Vec<(ChangeKind, &str)> = plan
        .changes
        .iter()
        .filter(|(kind, _)| *kind != ChangeKind::Unchanged)
        .collect();
    if !touched.is_empty() && plan.mode == RunMode::Incremental {
        println!("  Paths:");
        for (kind, path) in touched.iter().take(5) {
            println!("    - {} {}", path, format!("({})", kind.label()).dimmed());
        }
        if touched.len() > 5 {
            println!("    ... and {} more", touched.len() - 5);
        }
    }
    println!();

    if !plan.orphans.is_empty() {
        println!(
            "{} {} graph owners are not in the project",
            "Warning:".yellow(),
            plan.orphans.len()
        );
    }
    if !plan.skipped.is_empty() {
        println!("{} {} paths would be skipped", "Warning:".yellow(), plan.skipped.len());
    }

    // Helpful hints
    if counts.changed + counts.new + counts.deleted == 0 {
        println!("{}", "Graph is up to date".dimmed());
    } else {
        println!(
            "{}",
            format!("Tip: run 'gl update {} {}'", graph.display(), root.display()).dimmed()
        );
    }

    Ok(())
}
