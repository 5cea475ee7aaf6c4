//! Build a graph, edit the project, update it

use crate::common::TestProject;
use crate::gl;
use anyhow::Result;

#[test]
fn test_build_then_update_tracks_edits() -> Result<()> {
    let mut project = TestProject::sample()?;

    let build = gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    assert_eq!(build.field("Mode").as_deref(), Some("build"));
    assert_eq!(build.field("New").as_deref(), Some("4"));
    assert!(project.state().exists());

    let owners = project.owners()?;
    assert_eq!(owners, vec!["README.md", "app/main.py", "app/util.py", "lib/core.rs"]);
    let facts = project.facts_of("app/main.py")?;
    assert!(facts.contains(&(
        "app/main.py".to_string(),
        "defines".to_string(),
        "app/main.py#App".to_string()
    )));
    assert!(facts.contains(&("app/main.py".to_string(), "imports".to_string(), "os".to_string())));

    // Change one file, add one, delete one
    project.write("app/util.py", "def helper():\n    return 2\n\ndef other():\n    pass\n")?;
    project.write("web/index.ts", "export function render() {}\n")?;
    project.remove("README.md")?;

    let update = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(update.field("Mode").as_deref(), Some("incremental"));
    assert_eq!(update.field("Changed").as_deref(), Some("1"));
    assert_eq!(update.field("New").as_deref(), Some("1"));
    assert_eq!(update.field("Deleted").as_deref(), Some("1"));
    assert_eq!(update.field("Unchanged").as_deref(), Some("2"));

    let owners = project.owners()?;
    assert_eq!(owners, vec!["app/main.py", "app/util.py", "lib/core.rs", "web/index.ts"]);
    let util = project.facts_of("app/util.py")?;
    assert!(util.iter().any(|(_, _, o)| o == "app/util.py#other"));

    println!("build took {:?}, update took {:?}", build.duration, update.duration);
    Ok(())
}

#[test]
fn test_update_without_changes_keeps_graph() -> Result<()> {
    let project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;
    let before = std::fs::read(project.graph())?;

    let update = gl!(project.dir(), "update", project.graph_str(), project.root_str()).assert_success()?;
    assert_eq!(update.field("Changed").as_deref(), Some("0"));
    assert_eq!(update.field("New").as_deref(), Some("0"));
    assert_eq!(update.field("Deleted").as_deref(), Some("0"));
    assert_eq!(update.field("Unchanged").as_deref(), Some("4"));

    assert_eq!(std::fs::read(project.graph())?, before);
    Ok(())
}

#[test]
fn test_force_full_recomputes_everything() -> Result<()> {
    let project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;

    let update = gl!(
        project.dir(),
        "update",
        project.graph_str(),
        project.root_str(),
        "--force-full",
        "--workers",
        "2"
    )
    .assert_success()?;
    assert_eq!(update.field("Mode").as_deref(), Some("forced"));
    assert_eq!(update.field("New").as_deref(), Some("4"));
    assert_eq!(project.owners()?.len(), 4);
    Ok(())
}

#[test]
fn test_failed_recompute_follows_policy() -> Result<()> {
    let mut project = TestProject::sample()?;
    gl!(project.dir(), "build", project.root_str(), "-o", project.graph_str()).assert_success()?;

    // Not UTF-8, so the analyzer rejects it
    project.write_bytes("app/util.py", &[0xff, 0xfe, 0x00, 0x41])?;

    let restore = gl!(
        project.dir(),
        "update",
        project.graph_str(),
        project.root_str(),
        "--policy",
        "restore"
    )
    .assert_success()?;
    assert!(restore.contains_stdout("Graph updated with errors"));
    assert!(restore.contains_stdout("app/util.py"));
    assert!(project.owners()?.contains(&"app/util.py".to_string()));

    // Failed files are retried on the next run without being touched
    project.write_bytes("app/util.py", &[0xff, 0xfe, 0x00, 0x42])?;

    let drop = gl!(
        project.dir(),
        "update",
        project.graph_str(),
        project.root_str(),
        "--policy",
        "drop"
    )
    .assert_success()?;
    assert!(drop.contains_stdout("Errors:"));
    assert!(!project.owners()?.contains(&"app/util.py".to_string()));
    Ok(())
}

#[test]
fn test_quiet_build_prints_nothing() -> Result<()> {
    let project = TestProject::sample()?;
    let result = gl!(project.dir(), "-q", "build", project.root_str(), "-o", project.graph_str())
        .assert_success()?;
    assert!(result.stdout.is_empty());
    assert!(project.graph().exists());
    Ok(())
}
