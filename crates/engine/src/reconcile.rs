//! Graph reconciliation
//!
//! Applies a change set to a graph by retracting the facts owned by touched
//! files and inserting freshly recomputed ones. Facts owned by unchanged
//! files are never read, recomputed or rewritten.
//!
//! Recompute calls are pure, so they run first (possibly on a worker pool).
//! The results are then merged by a single writer in a fixed order:
//! deleted, changed, new, each in change-set order.

use crate::analyzer::{AnalysisError, Analyzer};
use crate::pool::RecomputePool;
use gl_core::{FactSet, Graph};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use watcher::ChangeSet;

/// What happens to a changed file's old facts when its recompute fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangedFailurePolicy {
    /// Leave the file owning nothing until a later run succeeds
    #[default]
    Drop,
    /// Put the previous facts back
    Restore,
}

impl fmt::Display for ChangedFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangedFailurePolicy::Drop => f.write_str("drop"),
            ChangedFailurePolicy::Restore => f.write_str("restore"),
        }
    }
}

impl FromStr for ChangedFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(ChangedFailurePolicy::Drop),
            "restore" => Ok(ChangedFailurePolicy::Restore),
            other => Err(format!(
                "unknown changed-failure policy '{}' (expected drop or restore)",
                other
            )),
        }
    }
}

/// A file whose recompute failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: String,
    pub reason: String,
}

impl FileError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Fact-level bookkeeping for one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Files whose recompute was attempted
    pub recomputed: usize,
    /// Facts removed from the graph
    pub retracted: usize,
    /// Facts added to the graph
    pub inserted: usize,
    /// Facts put back under [`ChangedFailurePolicy::Restore`]
    pub restored: usize,
}

/// Result of [`Reconciler::apply`]
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub graph: Graph,
    /// Per-file recompute failures, in merge order
    pub errors: Vec<FileError>,
    pub stats: ReconcileStats,
}

/// Applies change sets to graphs
pub struct Reconciler {
    policy: ChangedFailurePolicy,
    pool: RecomputePool,
}

impl Reconciler {
    /// Sequential reconciler with the given failure policy
    pub fn new(policy: ChangedFailurePolicy) -> Self {
        Self {
            policy,
            pool: RecomputePool::sequential(),
        }
    }

    /// Use `pool` for recompute calls
    pub fn with_pool(mut self, pool: RecomputePool) -> Self {
        self.pool = pool;
        self
    }

    pub fn policy(&self) -> ChangedFailurePolicy {
        self.policy
    }

    /// Reconcile `graph` with `changes`, recomputing through `analyzer`
    pub fn apply(&self, graph: Graph, changes: &ChangeSet, analyzer: &dyn Analyzer) -> ReconcileOutcome {
        self.apply_with_progress(graph, changes, analyzer, &|_| {})
    }

    /// Like [`apply`](Self::apply), calling `progress` after each recompute
    pub fn apply_with_progress(
        &self,
        mut graph: Graph,
        changes: &ChangeSet,
        analyzer: &dyn Analyzer,
        progress: &(dyn Fn(&str) + Sync),
    ) -> ReconcileOutcome {
        let mut stats = ReconcileStats::default();
        let mut errors = Vec::new();

        // 1. Recompute changed then new paths (pure, possibly parallel)
        let targets: Vec<&str> = changes.needs_recompute().collect();
        let mut results = self.pool.map(&targets, |path: &&str| {
            let path = *path;
            let result = analyzer.analyze(path);
            progress(path);
            result
        });
        debug_assert_eq!(results.len(), targets.len());
        let new_results = results.split_off(changes.changed.len());
        stats.recomputed = targets.len();

        // 2. Deleted: retract only
        for path in &changes.deleted {
            let removed = graph.retract(path);
            debug!("Retracted {} facts of deleted {}", removed.len(), path);
            stats.retracted += removed.len();
        }

        // 3. Changed: retract, then insert the recomputed facts
        for (path, result) in changes.changed.iter().zip(results) {
            let previous = graph.retract(path);
            stats.retracted += previous.len();
            self.merge(&mut graph, path, previous, result, &mut stats, &mut errors);
        }

        // 4. New: insert (replacing stale facts left by an older graph)
        for (path, result) in changes.new.iter().zip(new_results) {
            let stale = graph.retract(path);
            if !stale.is_empty() {
                debug!("Replacing {} stale facts owned by new {}", stale.len(), path);
                stats.retracted += stale.len();
            }
            self.merge(&mut graph, path, stale, result, &mut stats, &mut errors);
        }

        // 5. Unchanged: nothing to do

        ReconcileOutcome {
            graph,
            errors,
            stats,
        }
    }

    /// Install one file's recompute result after its old facts were retracted
    fn merge(
        &self,
        graph: &mut Graph,
        path: &str,
        previous: FactSet,
        result: Result<FactSet, AnalysisError>,
        stats: &mut ReconcileStats,
        errors: &mut Vec<FileError>,
    ) {
        match result {
            Ok(facts) => {
                stats.inserted += facts.len();
                graph.insert(path, facts);
            }
            Err(e) => {
                warn!("Recompute failed for {}: {}", path, e);
                errors.push(FileError::new(path, e.to_string()));

                if self.policy == ChangedFailurePolicy::Restore && !previous.is_empty() {
                    stats.restored += previous.len();
                    stats.retracted -= previous.len();
                    graph.insert(path, previous);
                }
            }
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ChangedFailurePolicy::default())
    }
}
