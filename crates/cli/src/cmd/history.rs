//! Show the run history kept in a graph's state file

use anyhow::{Context, Result};
use cli_lib::util;
use journal::{state_path_for, AnalysisStateStore, StateError};
use owo_colors::OwoColorize;
use std::path::Path;

const DEFAULT_LIMIT: usize = 20;

pub fn run(graph: &Path, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    // 1. Load state
    let state_path = state_path_for(graph);
    let state = match AnalysisStateStore::new().load(&state_path) {
        Ok(state) => state,
        Err(StateError::NotFound(_)) => {
            anyhow::bail!(
                "No run history for {} (run 'gl build' first)",
                graph.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read history of {}", graph.display()));
        }
    };

    // 2. Header
    let last_ms = state.timestamp.timestamp_millis();
    println!("{}", "Run History".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    print!("Project:       {}", state.project.name.cyan());
    if let Some(version) = &state.project.version {
        print!(" {}", version.dimmed());
    }
    println!();
    println!("Root:          {}", state.project.path);
    println!(
        "Last analysis: {} ({})",
        util::format_relative_time(last_ms),
        util::format_absolute_time(last_ms).dimmed()
    );
    println!("Files:         {}", state.file_count());
    println!();

    // 3. Records, newest first
    let records = state.history();
    if records.is_empty() {
        println!("{}", "No runs recorded".dimmed());
        return Ok(());
    }

    if let Some(latest) = records.last() {
        println!("Latest run:    {}", latest.id.to_string().yellow());
        if !latest.touched_paths.is_empty() {
            println!("  Touched:");
            for path in latest.touched_paths.iter().take(5) {
                println!("    - {}", path);
            }
            let more = latest.counts.touched().saturating_sub(5);
            if more > 0 {
                println!("    ... and {} more", more);
            }
        }
        println!();
    }

    for record in records.iter().rev().take(limit) {
        util::display_run_compact(record);
    }

    if records.len() > limit {
        println!();
        println!(
            "{}",
            format!("Showing {} of {} runs (use --limit)", limit, records.len()).dimmed()
        );
    }

    Ok(())
}
