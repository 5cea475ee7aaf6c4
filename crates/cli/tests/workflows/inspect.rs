//! Read-only commands: status, history, config

use crate::common::TestProject;
use crate::gl;
use anyhow::Result;

#[test]
fn test_status_reports_pending_changes_without_writing() -> Result<()> {
    let mut project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    let state_before = std::fs::read(project.state())?;

    let clean = gl!(project.dir(), "status", project.graph_str(), project.root_str()).assert_success()?;
    assert!(clean.contains_stdout("Graph is up to date"));
    assert_eq!(clean.field("Next run").as_deref(), Some("incremental"));

    project.write("app/extra.py", "def extra():\n    pass\n")?;
    let dirty = gl!(project.dir(), "status", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(dirty.field("New").as_deref(), Some("1"));
    assert!(dirty.contains_stdout("app/extra.py"));

    assert_eq!(std::fs::read(project.state())?, state_before);
    assert!(!project.owners()?.contains(&"app/extra.py".to_string()));
    Ok(())
}

#[test]
fn test_history_lists_runs_newest_first() -> Result<()> {
    let mut project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    project.write("app/util.py", "def helper():\n    return 3\n")?;
    gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;

    let history = gl!(project.dir(), "history", project.graph_str()).assert_success()?;
    assert_eq!(history.field("Project").as_deref(), Some("project"));
    assert_eq!(history.field("Files").as_deref(), Some("4"));
    assert!(history.parse_run_id().is_some());

    let runs: Vec<&str> = history
        .stdout
        .lines()
        .filter(|line| line.contains(" build ") || line.contains(" incremental "))
        .collect();
    assert_eq!(runs.len(), 2);
    assert!(runs[0].contains("incremental"));
    assert!(runs[1].contains("build"));

    let limited = gl!(project.dir(), "history", project.graph_str(), "--limit", "1").assert_success()?;
    assert!(limited.contains_stdout("Showing 1 of 2 runs"));
    Ok(())
}

#[test]
fn test_history_without_state_fails() -> Result<()> {
    let project = TestProject::new()?;
    let result = gl!(project.dir(), "history", project.graph_str()).assert_exit(1)?;
    assert!(result.contains_stderr("No run history"));
    Ok(())
}

#[test]
fn test_config_example_and_list() -> Result<()> {
    let mut project = TestProject::new()?;

    let example = gl!(project.dir(), "config", "--example").assert_success()?;
    assert!(example.contains_stdout("[update]"));
    assert!(example.contains_stdout("changed_failure = \"drop\""));

    let defaults = gl!(project.dir(), "config", "--root", project.root_str()).assert_success()?;
    assert!(defaults.contains_stdout("built-in defaults"));

    project.write(".graphlapse.toml", "[update]\nchanged_failure = \"restore\"\n")?;
    let list = gl!(project.dir(), "config", "--list", "--root", project.root_str()).assert_success()?;
    assert!(list.contains_stdout("changed_failure = restore"));
    assert!(list.contains_stdout("(project)"));

    let path = gl!(project.dir(), "config", "--path", "--root", project.root_str()).assert_success()?;
    assert!(path.stdout.trim().ends_with(".graphlapse.toml"));
    Ok(())
}
