//! Build a graph from scratch

use super::update::{print_outcome, progress_bar};
use anyhow::{Context, Result};
use cli_lib::config;
use engine::{OutlineAnalyzer, UpdateDriver};
use gl_core::JsonGraphStore;
use std::path::Path;

pub fn run(
    root: &Path,
    output: &Path,
    workers: Option<usize>,
    config_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    // 1. Resolve configuration
    let (config, source) = config::resolve(config_path, Some(root))?;
    tracing::debug!("Using configuration from {}", source);
    let mut options = config.update_options(root);
    if let Some(workers) = workers {
        options.workers = workers;
    }

    // 2. Analyze every file
    let store = JsonGraphStore::new();
    let analyzer = OutlineAnalyzer::new(root);
    let driver = UpdateDriver::new(&store, &analyzer, options);

    let progress = progress_bar(quiet);
    let outcome = driver
        .build_with_progress(output, root, &|path| {
            progress.inc(1);
            progress.set_message(path.to_string());
        })
        .with_context(|| format!("Failed to build {}", output.display()));
    progress.finish_and_clear();
    let outcome = outcome?;

    // 3. Report
    if !quiet {
        print_outcome(&outcome, &config);
    }
    Ok(())
}
