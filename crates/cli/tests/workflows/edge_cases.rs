//! Failure handling and degraded runs

use crate::common::TestProject;
use crate::gl;
use anyhow::Result;
use std::fs;

#[test]
fn test_update_missing_graph_fails() -> Result<()> {
    let project = TestProject::sample()?;

    let result = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_exit(1)?;
    assert!(result.contains_stderr("error:"));
    assert!(result.contains_stderr("graph file not found"));
    assert!(!project.state().exists());
    Ok(())
}

#[test]
fn test_missing_arguments_is_usage_error() -> Result<()> {
    let project = TestProject::new()?;

    gl!(project.dir(), "update", project.graph_str()).assert_exit(2)?;
    gl!(project.dir(), "build", project.root_str()).assert_exit(2)?;
    gl!(project.dir(), "update", "g.json", ".", "--policy", "sometimes").assert_exit(2)?;
    Ok(())
}

#[test]
fn test_missing_root_fails() -> Result<()> {
    let project = TestProject::new()?;
    let missing = project.dir().join("nowhere");

    let result = gl!(
        project.dir(),
        "build",
        missing.to_str().unwrap_or("nowhere"),
        "-o",
        project.graph_str()
    )
    .assert_exit(1)?;
    assert!(result.contains_stderr("project root not found"));
    assert!(!project.graph().exists());
    Ok(())
}

#[test]
fn test_corrupt_state_falls_back_to_full_analysis() -> Result<()> {
    let project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    fs::write(project.state(), "{ not json")?;

    let result = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(result.field("Mode").as_deref(), Some("fallback"));
    assert!(result.field("Fallback").is_some());
    assert_eq!(result.field("New").as_deref(), Some("4"));
    assert!(result.contains_stderr("falling back"));

    // The rewritten state makes the next run incremental again
    let next = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(next.field("Mode").as_deref(), Some("incremental"));
    assert_eq!(next.field("Unchanged").as_deref(), Some("4"));
    Ok(())
}

#[test]
fn test_missing_state_keeps_orphans() -> Result<()> {
    let project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    fs::remove_file(project.state())?;
    project.remove("README.md")?;

    let result = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(result.field("Mode").as_deref(), Some("fallback"));
    assert!(result.contains_stdout("graph owners are not in the project"));
    assert!(project.owners()?.contains(&"README.md".to_string()));

    // Still reported once the state is back
    let next = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(next.field("Mode").as_deref(), Some("incremental"));
    assert!(next.contains_stdout("graph owners are not in the project"));

    // A rebuild starts from an empty graph
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    assert!(!project.owners()?.contains(&"README.md".to_string()));
    Ok(())
}

#[test]
fn test_invalid_project_config_fails() -> Result<()> {
    let mut project = TestProject::sample()?;
    project.write(".graphlapse.toml", "[update]\nworkers = 999\n")?;

    let result = gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_exit(1)?;
    assert!(result.contains_stderr("update.workers must be 0-256"));
    Ok(())
}

#[test]
fn test_project_config_include_filters_files() -> Result<()> {
    let mut project = TestProject::sample()?;
    project.write(".graphlapse.toml", "[scan]\ninclude = [\"*.py\"]\n")?;

    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    assert_eq!(project.owners()?, vec!["app/main.py", "app/util.py"]);
    Ok(())
}

#[test]
fn test_unwritable_state_fails() -> Result<()> {
    let project = TestProject::sample()?;
    fs::create_dir_all(project.state())?;

    let result = gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_exit(1)?;
    assert!(result.contains_stderr("error:"));
    assert!(result.contains_stderr("state error"));
    assert!(project.state().is_dir());
    Ok(())
}

#[test]
fn test_project_config_is_not_analyzed() -> Result<()> {
    let mut project = TestProject::sample()?;
    project.write(".graphlapse.toml", "[update]\nworkers = 2\n")?;

    let build = gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    assert_eq!(build.field("New").as_deref(), Some("4"));
    assert!(!project.owners()?.contains(&".graphlapse.toml".to_string()));

    // Editing it is not a project change either
    project.write(".graphlapse.toml", "[update]\nworkers = 1\n")?;
    let update = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(update.field("Changed").as_deref(), Some("0"));
    assert_eq!(update.field("New").as_deref(), Some("0"));
    Ok(())
}
