//! Run records
//!
//! Every successful run appends one record to the state metadata, so the
//! state file doubles as a short log of how the graph evolved.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use watcher::{ChangeCounts, ChangeSet};

/// Metadata key holding the run records
pub(crate) const HISTORY_KEY: &str = "history";

/// Upper bound on paths stored per record
pub const MAX_TOUCHED_PATHS: usize = 20;

/// How a run decided what to recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Diffed against a valid previous state
    Incremental,
    /// Previous state missing or corrupt; everything treated as new
    Fallback,
    /// Full recompute requested explicitly
    Forced,
    /// First analysis starting from an empty graph
    Build,
}

impl RunMode {
    /// Whether every scanned path was classified as new
    pub fn is_full(self) -> bool {
        !matches!(self, RunMode::Incremental)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunMode::Incremental => "incremental",
            RunMode::Fallback => "fallback",
            RunMode::Forced => "forced",
            RunMode::Build => "build",
        }
    }
}

/// Summary of one completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique ID (ULID for timestamp + uniqueness)
    pub id: Ulid,
    /// Timestamp (Unix milliseconds)
    pub ts_unix_ms: i64,
    pub mode: RunMode,
    pub counts: ChangeCounts,
    /// Number of files whose recompute failed
    pub errors: usize,
    /// First touched paths (changed, new, then deleted)
    #[serde(default)]
    pub touched_paths: Vec<String>,
}

impl RunRecord {
    /// Record a run that finished now
    pub fn new(mode: RunMode, changes: &ChangeSet, errors: usize) -> Self {
        let touched_paths = changes
            .changed
            .iter()
            .chain(&changes.new)
            .chain(&changes.deleted)
            .take(MAX_TOUCHED_PATHS)
            .cloned()
            .collect();

        Self {
            id: Ulid::new(),
            ts_unix_ms: Utc::now().timestamp_millis(),
            mode,
            counts: changes.counts(),
            errors,
            touched_paths,
        }
    }

    /// Number of touched paths not listed in `touched_paths`
    pub fn untracked_touches(&self) -> usize {
        self.counts.touched().saturating_sub(self.touched_paths.len())
    }
}
