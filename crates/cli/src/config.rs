//! Project configuration
//!
//! Configuration is read from the first file found in:
//! 1. `--config <path>` (must exist)
//! 2. `<root>/.graphlapse.toml`
//! 3. `$XDG_CONFIG_HOME/graphlapse/config.toml` (platform config dir)
//!
//! Built-in defaults apply when none exists. Command-line flags override
//! whatever the file says.

use anyhow::{Context, Result};
use engine::{ChangedFailurePolicy, UpdateOptions, DEFAULT_ERROR_LIMIT};
use journal::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use watcher::{FingerprintMode, IgnoreConfig, ScanOptions};

/// Per-project config file name
pub const PROJECT_CONFIG_FILE: &str = ".graphlapse.toml";

/// Graphlapse configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub scan: ScanConfig,
    pub update: UpdateConfig,
    pub history: HistoryConfig,
    pub project: ProjectSection,
}

/// `[scan]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Gitignore-style globs selecting tracked files (empty = all files)
    pub include: Vec<String>,
    /// `metadata` (mtime + size) or `content` (adds a BLAKE3 hash)
    pub fingerprint: FingerprintMode,
    pub use_gitignore: bool,
    pub use_glignore: bool,
    /// Extra gitignore-style exclusion lines
    pub additional_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            fingerprint: FingerprintMode::Metadata,
            use_gitignore: true,
            use_glignore: true,
            additional_patterns: Vec::new(),
        }
    }
}

/// `[update]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Recompute workers (0 = one per CPU)
    pub workers: usize,
    /// What happens to a changed file's facts when its recompute fails
    pub changed_failure: ChangedFailurePolicy,
    /// Per-file errors listed in reports before truncating
    pub error_report_limit: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            changed_failure: ChangedFailurePolicy::Drop,
            error_report_limit: DEFAULT_ERROR_LIMIT,
        }
    }
}

/// `[history]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Run records kept in the state file
    pub retain_runs: usize,
    /// Keep per-file revision history
    pub track_files: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retain_runs: RetentionPolicy::default().retain_runs,
            track_files: true,
        }
    }
}

/// `[project]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: Option<String>,
    pub version: Option<String>,
}

impl ProjectConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.update.workers > 256 {
            anyhow::bail!("update.workers must be 0-256 (got {})", self.update.workers);
        }
        if !(1..=1000).contains(&self.update.error_report_limit) {
            anyhow::bail!(
                "update.error_report_limit must be 1-1000 (got {})",
                self.update.error_report_limit
            );
        }
        if !(1..=10_000).contains(&self.history.retain_runs) {
            anyhow::bail!(
                "history.retain_runs must be 1-10,000 (got {})",
                self.history.retain_runs
            );
        }
        if self.scan.include.iter().any(|g| g.trim().is_empty()) {
            anyhow::bail!("scan.include must not contain empty globs");
        }
        Ok(())
    }

    /// Parse and validate a config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Scanner options from the `[scan]` section
    ///
    /// The project config file under `root` is never tracked.
    pub fn scan_options(&self, root: &Path) -> ScanOptions {
        ScanOptions {
            include: self.scan.include.clone(),
            ignore: IgnoreConfig {
                use_gitignore: self.scan.use_gitignore,
                use_glignore: self.scan.use_glignore,
                additional_patterns: self.scan.additional_patterns.clone(),
            },
            mode: self.scan.fingerprint,
            exclude_paths: vec![root.join(PROJECT_CONFIG_FILE)],
        }
    }

    /// Driver options from all sections for the project at `root`
    pub fn update_options(&self, root: &Path) -> UpdateOptions {
        UpdateOptions {
            force_full: false,
            policy: self.update.changed_failure,
            workers: self.update.workers,
            scan: self.scan_options(root),
            retention: RetentionPolicy::new(self.history.retain_runs),
            track_files: self.history.track_files,
            project_name: self.project.name.clone(),
            project_version: self.project.version.clone(),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Project(PathBuf),
    User(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Project(p) | ConfigSource::User(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "{} (--config)", p.display()),
            ConfigSource::Project(p) => write!(f, "{} (project)", p.display()),
            ConfigSource::User(p) => write!(f, "{} (user)", p.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// User-level config file path
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("graphlapse").join("config.toml"))
}

/// Find and load the effective configuration
pub fn resolve(explicit: Option<&Path>, root: Option<&Path>) -> Result<(ProjectConfig, ConfigSource)> {
    // 1. Explicit path (must exist)
    if let Some(path) = explicit {
        let config = ProjectConfig::load_from(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    // 2. Project file
    if let Some(root) = root {
        let path = root.join(PROJECT_CONFIG_FILE);
        if path.is_file() {
            let config = ProjectConfig::load_from(&path)?;
            return Ok((config, ConfigSource::Project(path)));
        }
    }

    // 3. User file
    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        let config = ProjectConfig::load_from(&path)?;
        return Ok((config, ConfigSource::User(path)));
    }

    // 4. Defaults
    Ok((ProjectConfig::default(), ConfigSource::Defaults))
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# Graphlapse configuration
# Place in <project>/.graphlapse.toml or ~/.config/graphlapse/config.toml

[scan]
# Gitignore-style globs selecting tracked files (empty = all files)
include = ["*.py", "*.rs", "*.ts", "*.js", "*.go", "*.java"]
# "metadata" (mtime + size) or "content" (adds a BLAKE3 hash)
fingerprint = "metadata"
use_gitignore = true
use_glignore = true
additional_patterns = []

[update]
# Recompute workers (0 = one per CPU, max 256)
workers = 0
# "drop" or "restore" the facts of a changed file whose recompute fails
changed_failure = "drop"
# Per-file errors listed before "+K more" (1-1000)
error_report_limit = 10

[history]
# Run records kept in the state file (1-10,000)
retain_runs = 100
track_files = true

[project]
# name = "my-project"
# version = "1.0.0"
"#
}
