//! Throwaway projects for CLI tests

use anyhow::Result;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A project directory with the graph file kept beside it
pub struct TestProject {
    temp: TempDir,
    root: PathBuf,
    graph: PathBuf,
    clock: i64,
}

impl TestProject {
    /// Empty project under `<tmp>/project`, graph at `<tmp>/graph.json`
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().join("project");
        fs::create_dir_all(&root)?;
        let graph = temp.path().join("graph.json");
        Ok(Self {
            temp,
            root,
            graph,
            clock: 1_700_000_000,
        })
    }

    /// Small multi-language project
    pub fn sample() -> Result<Self> {
        let mut project = Self::new()?;
        project.write(
            "app/main.py",
            "import os\nfrom app import util\n\nclass App:\n    pass\n\ndef main():\n    pass\n",
        )?;
        project.write("app/util.py", "def helper():\n    return 1\n")?;
        project.write("lib/core.rs", "use std::fmt;\n\npub struct Core;\n\npub fn run() {}\n")?;
        project.write("README.md", "# sample\n")?;
        Ok(project)
    }

    /// Directory the commands run in
    pub fn dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_str(&self) -> &str {
        self.root.to_str().unwrap_or("project")
    }

    pub fn graph(&self) -> &Path {
        &self.graph
    }

    pub fn graph_str(&self) -> &str {
        self.graph.to_str().unwrap_or("graph.json")
    }

    pub fn state(&self) -> PathBuf {
        let mut name = self.graph.as_os_str().to_owned();
        name.push(".state.json");
        PathBuf::from(name)
    }

    /// Write a file, giving it an mtime later than any earlier write
    pub fn write(&mut self, rel: &str, content: &str) -> Result<()> {
        self.write_bytes(rel, content.as_bytes())
    }

    pub fn write_bytes(&mut self, rel: &str, content: &[u8]) -> Result<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        self.clock += 10;
        set_file_mtime(&path, FileTime::from_unix_time(self.clock, 0))?;
        Ok(())
    }

    pub fn remove(&self, rel: &str) -> Result<()> {
        fs::remove_file(self.root.join(rel))?;
        Ok(())
    }

    /// Parsed graph document
    pub fn graph_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&fs::read(&self.graph)?)?)
    }

    /// Owners present in the graph file
    pub fn owners(&self) -> Result<Vec<String>> {
        let doc = self.graph_json()?;
        let owners = doc["owners"]
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        Ok(owners)
    }

    /// Facts owned by `owner` as (subject, predicate, object)
    pub fn facts_of(&self, owner: &str) -> Result<Vec<(String, String, String)>> {
        let doc = self.graph_json()?;
        let mut facts = Vec::new();
        if let Some(list) = doc["owners"][owner].as_array() {
            for fact in list {
                let part = |i: usize| fact[i].as_str().unwrap_or_default().to_string();
                facts.push((part(0), part(1), part(2)));
            }
        }
        Ok(facts)
    }
}
