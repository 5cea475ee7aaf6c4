//! Four-way change classification
//!
//! Compares a previous fingerprint snapshot against a fresh scan and
//! partitions every known path into exactly one of `changed`, `new`,
//! `deleted` or `unchanged`.

use crate::fingerprint::{FileFingerprint, FingerprintMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of a single path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present before and now, fingerprint differs
    Changed,
    /// Present now only
    New,
    /// Present before only
    Deleted,
    /// Present before and now, fingerprint identical
    Unchanged,
}

impl ChangeKind {
    /// Lowercase label used in reports
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Changed => "changed",
            ChangeKind::New => "new",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Unchanged => "unchanged",
        }
    }
}

/// Result of comparing two fingerprint sets
///
/// Each bucket is sorted. The buckets are pairwise disjoint and together
/// cover `previous ∪ current`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub changed: Vec<String>,
    pub new: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Per-bucket sizes of a change set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub changed: usize,
    pub new: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ChangeCounts {
    /// Number of paths whose facts are touched
    pub fn touched(&self) -> usize {
        self.changed + self.new + self.deleted
    }

    /// Total number of classified paths
    pub fn total(&self) -> usize {
        self.touched() + self.unchanged
    }
}

impl ChangeSet {
    /// Classify every path as new (no prior snapshot to diff against)
    pub fn all_new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut new: Vec<String> = paths.into_iter().map(Into::into).collect();
        new.sort();
        new.dedup();
        Self {
            new,
            ..Self::default()
        }
    }

    /// Bucket sizes
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            changed: self.changed.len(),
            new: self.new.len(),
            deleted: self.deleted.len(),
            unchanged: self.unchanged.len(),
        }
    }

    /// Total number of classified paths
    pub fn len(&self) -> usize {
        self.counts().total()
    }

    /// Check if no path was classified
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any path needs retraction or recomputation
    pub fn has_changes(&self) -> bool {
        self.counts().touched() > 0
    }

    /// Iterate every `(kind, path)` pair, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = (ChangeKind, &str)> {
        [
            (ChangeKind::Changed, &self.changed),
            (ChangeKind::New, &self.new),
            (ChangeKind::Deleted, &self.deleted),
            (ChangeKind::Unchanged, &self.unchanged),
        ]
        .into_iter()
        .flat_map(|(kind, bucket)| bucket.iter().map(move |p| (kind, p.as_str())))
    }

    /// Paths that must be recomputed: changed first, then new
    pub fn needs_recompute(&self) -> impl Iterator<Item = &str> {
        self.changed
            .iter()
            .chain(self.new.iter())
            .map(String::as_str)
    }
}

/// Classify all paths of `previous ∪ current`
///
/// With no previous snapshot every current path is `new`.
pub fn diff(previous: Option<&FingerprintMap>, current: &[FileFingerprint]) -> ChangeSet {
    let Some(previous) = previous else {
        return ChangeSet::all_new(current.iter().map(|fp| fp.path.clone()));
    };

    let current: BTreeMap<&str, &FileFingerprint> =
        current.iter().map(|fp| (fp.path.as_str(), fp)).collect();

    let mut set = ChangeSet::default();

    for (path, before) in previous {
        match current.get(path.as_str()) {
            Some(now) if before.differs_from(now) => set.changed.push(path.clone()),
            Some(_) => set.unchanged.push(path.clone()),
            None => set.deleted.push(path.clone()),
        }
    }

    set.new = current
        .keys()
        .filter(|path| !previous.contains_key(**path))
        .map(|path| path.to_string())
        .collect();

    // Both maps iterate in key order, so every bucket is already sorted
    set
}
