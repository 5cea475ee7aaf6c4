//! Ignore pattern management for scans
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (VCS metadata, dependency/build directories, editor
//!    temp files - always active)
//! 2. .gitignore patterns (optional, enabled by default)
//! 3. .glignore patterns (graphlapse-specific, optional)
//! 4. Config-based patterns (additional gitignore-style lines)

use anyhow::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory names that are never scanned
const BUILTIN_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".jj",
    ".graphlapse",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
];

/// Ignore rule manager
///
/// Combines multiple sources of ignore patterns with proper precedence:
/// 1. Built-in patterns (highest priority - always enforced)
/// 2. .glignore patterns (a whitelist here overrides .gitignore)
/// 3. .gitignore patterns
/// 4. Additional config patterns
///
/// All paths passed in are relative to the project root.
pub struct IgnoreRules {
    /// Project root directory
    root: PathBuf,

    /// Gitignore patterns (optional)
    gitignore: Option<Gitignore>,

    /// Graphlapse-specific ignore patterns (optional)
    glignore: Option<Gitignore>,

    /// Patterns from configuration
    extra: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for a project
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            glignore: None,
            extra: None,
            config,
        };

        rules.reload_ignore_files()?;
        Ok(rules)
    }

    /// Reload ignore files from disk
    pub fn reload_ignore_files(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            self.build_from_file(".gitignore")?
        } else {
            None
        };

        self.glignore = if self.config.use_glignore {
            self.build_from_file(".glignore")?
        } else {
            None
        };

        self.extra = if self.config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.additional_patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        Ok(())
    }

    fn build_from_file(&self, name: &str) -> Result<Option<Gitignore>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(&path) {
            tracing::warn!("Problem reading {}: {}", path.display(), err);
        }
        Ok(Some(builder.build()?))
    }

    /// Check if a root-relative path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        // 1. Built-in patterns (highest priority - always enforced)
        if is_builtin_ignored(path) {
            return true;
        }

        // 2. .glignore (a whitelist entry rescues the path from .gitignore)
        if let Some(ref glignore) = self.glignore {
            let matched = glignore.matched_path_or_any_parents(path, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        // 3. .gitignore
        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched_path_or_any_parents(path, is_dir).is_ignore() {
                return true;
            }
        }

        // 4. Additional config patterns
        if let Some(ref extra) = self.extra {
            if extra.matched_path_or_any_parents(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }
}

/// Check if a path matches built-in ignore patterns
fn is_builtin_ignored(path: &Path) -> bool {
    let in_builtin_dir = path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| BUILTIN_DIRS.contains(&name));
    if in_builtin_dir {
        return true;
    }

    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    is_editor_temp(filename)
}

/// Editor swap/backup files and OS metadata files
fn is_editor_temp(filename: &str) -> bool {
    // Vim swap files
    if [".swp", ".swo", ".swn"].iter().any(|ext| filename.ends_with(ext)) {
        return true;
    }

    // Vim/Emacs backups, Emacs auto-save and lock files
    if filename.ends_with('~')
        || (filename.len() > 1 && filename.starts_with('#') && filename.ends_with('#'))
        || filename.starts_with(".#")
    {
        return true;
    }

    // OS metadata
    matches!(filename, ".DS_Store" | "Thumbs.db" | "desktop.ini") || filename.starts_with("._")
}

/// Ignore configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .glignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_glignore: bool,

    /// Additional gitignore-style patterns from config
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_glignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
