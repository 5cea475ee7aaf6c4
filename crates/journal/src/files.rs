//! Per-file revision history

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use watcher::{ChangeKind, ChangeSet};

/// Metadata key holding per-file history
pub(crate) const FILE_HISTORY_KEY: &str = "file_history";

/// History entries keyed by project-relative path
pub type FileHistory = BTreeMap<String, FileRevision>;

/// Revision bookkeeping for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRevision {
    /// First run that saw the file (Unix milliseconds)
    pub first_seen_ms: i64,
    /// Last run that saw it change (Unix milliseconds)
    pub last_changed_ms: i64,
    /// Number of distinct revisions observed
    pub revisions: u64,
}

impl FileRevision {
    fn first(now_ms: i64) -> Self {
        Self {
            first_seen_ms: now_ms,
            last_changed_ms: now_ms,
            revisions: 1,
        }
    }
}

/// Fold one run's change set into `history`
///
/// New files get an entry, changed files are bumped and deleted files are
/// forgotten. A `new` path that already has an entry keeps its first-seen time.
pub fn record_changes(history: &mut FileHistory, changes: &ChangeSet, now_ms: i64) {
    for (kind, path) in changes.iter() {
        match kind {
            ChangeKind::New => {
                history
                    .entry(path.to_string())
                    .or_insert_with(|| FileRevision::first(now_ms));
            }
            ChangeKind::Changed => {
                history
                    .entry(path.to_string())
                    .and_modify(|rev| {
                        rev.last_changed_ms = now_ms;
                        rev.revisions += 1;
                    })
                    .or_insert_with(|| FileRevision::first(now_ms));
            }
            ChangeKind::Deleted => {
                history.remove(path);
            }
            ChangeKind::Unchanged => {}
        }
    }
}
