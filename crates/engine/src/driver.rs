//! Update driver
//!
//! Runs one update cycle as a fixed sequence of stages:
//!
//! ```text
//! LoadGraph -> LoadState -> DetectChanges -> Reconcile -> Persist
//! ```
//!
//! Stages never loop back. Only graph loading and the final writes can
//! abort a run; a missing or corrupt state downgrades the run to a full
//! recompute, and per-file recompute failures are collected in the outcome.

use crate::analyzer::Analyzer;
use crate::pool::RecomputePool;
use crate::reconcile::{ChangedFailurePolicy, FileError, ReconcileStats, Reconciler};
use chrono::Utc;
use gl_core::{Graph, GraphError, GraphStore};
use journal::{
    record_changes, state_path_for, AnalysisState, AnalysisStateStore, ProjectDescriptor,
    RetentionPolicy, RunMode, RunRecord, StateError,
};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use watcher::{diff, ChangeSet, FileFingerprint, FingerprintScanner, ScanError, ScanOptions};

/// Pipeline stage of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadGraph,
    LoadState,
    DetectChanges,
    Reconcile,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadGraph => "load graph",
            Stage::LoadState => "load state",
            Stage::DetectChanges => "detect changes",
            Stage::Reconcile => "reconcile",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Fatal run failures
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The project root cannot be scanned (checked before any stage runs)
    #[error("cannot open project")]
    Project(#[source] ScanError),

    /// Scanning failed part-way
    #[error("{stage} failed: project scan error")]
    Scan {
        stage: Stage,
        #[source]
        source: ScanError,
    },

    /// Reading or writing the graph failed
    #[error("{stage} failed: graph error")]
    Graph {
        stage: Stage,
        #[source]
        source: GraphError,
    },

    /// Writing the state failed
    #[error("{stage} failed: state error")]
    State {
        stage: Stage,
        #[source]
        source: StateError,
    },

    /// The recompute pool could not be started
    #[error("{stage} failed: cannot start recompute workers")]
    Workers {
        stage: Stage,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

impl UpdateError {
    /// Stage in which the run aborted (`None` if no stage ran)
    pub fn stage(&self) -> Option<Stage> {
        match self {
            UpdateError::Project(_) => None,
            UpdateError::Scan { stage, .. }
            | UpdateError::Graph { stage, .. }
            | UpdateError::State { stage, .. }
            | UpdateError::Workers { stage, .. } => Some(*stage),
        }
    }
}

/// Run configuration
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Ignore any previous state and recompute everything
    pub force_full: bool,
    pub policy: ChangedFailurePolicy,
    /// Recompute workers (0 = rayon default, 1 = sequential)
    pub workers: usize,
    pub scan: ScanOptions,
    pub retention: RetentionPolicy,
    /// Maintain per-file revision history in the state metadata
    pub track_files: bool,
    /// Overrides for the state's project descriptor
    pub project_name: Option<String>,
    pub project_version: Option<String>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            force_full: false,
            policy: ChangedFailurePolicy::default(),
            workers: 1,
            scan: ScanOptions::default(),
            retention: RetentionPolicy::default(),
            track_files: true,
            project_name: None,
            project_version: None,
        }
    }
}

/// What a run would do, computed without recomputing or writing
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub mode: RunMode,
    /// Why the run is not incremental (missing or corrupt state)
    pub fallback_cause: Option<String>,
    pub changes: ChangeSet,
    /// Graph owners absent from the scan and not classified as deleted
    pub orphans: Vec<String>,
    /// Entries the scanner could not fingerprint
    pub skipped: Vec<(PathBuf, String)>,
    /// Timestamp of the previous state, if one was used
    pub previous_run: Option<chrono::DateTime<Utc>>,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub mode: RunMode,
    pub fallback_cause: Option<String>,
    pub changes: ChangeSet,
    /// Per-file recompute failures (the run still succeeded)
    pub errors: Vec<FileError>,
    pub stats: ReconcileStats,
    pub orphans: Vec<String>,
    pub skipped: Vec<(PathBuf, String)>,
    /// Distinct facts in the written graph
    pub fact_count: usize,
    /// Files owning facts in the written graph
    pub owner_count: usize,
    /// Record appended to the run history
    pub record: RunRecord,
    pub graph_path: PathBuf,
    pub state_path: PathBuf,
}

/// Everything gathered before reconciliation
struct Prepared {
    graph: Graph,
    previous: Option<AnalysisState>,
    fingerprints: Vec<FileFingerprint>,
    plan: UpdatePlan,
    root: PathBuf,
}

/// Orchestrates one update cycle
pub struct UpdateDriver<'a> {
    graphs: &'a dyn GraphStore,
    analyzer: &'a dyn Analyzer,
    states: AnalysisStateStore,
    options: UpdateOptions,
}

impl<'a> UpdateDriver<'a> {
    pub fn new(graphs: &'a dyn GraphStore, analyzer: &'a dyn Analyzer, options: UpdateOptions) -> Self {
        Self {
            graphs,
            analyzer,
            states: AnalysisStateStore::new(),
            options,
        }
    }

    pub fn options(&self) -> &UpdateOptions {
        &self.options
    }

    /// Update the graph at `graph_path` for the project at `root`
    pub fn update(&self, graph_path: &Path, root: &Path) -> Result<UpdateOutcome, UpdateError> {
        self.update_with_progress(graph_path, root, &|_| {})
    }

    /// Like [`update`](Self::update), calling `progress` after each recompute
    pub fn update_with_progress(
        &self,
        graph_path: &Path,
        root: &Path,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Result<UpdateOutcome, UpdateError> {
        let mode = if self.options.force_full {
            RunMode::Forced
        } else {
            RunMode::Incremental
        };
        let prepared = self.prepare(graph_path, root, mode)?;
        self.execute(graph_path, prepared, progress)
    }

    /// Analyze the project from scratch, ignoring any existing graph
    pub fn build(&self, graph_path: &Path, root: &Path) -> Result<UpdateOutcome, UpdateError> {
        self.build_with_progress(graph_path, root, &|_| {})
    }

    pub fn build_with_progress(
        &self,
        graph_path: &Path,
        root: &Path,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Result<UpdateOutcome, UpdateError> {
        let prepared = self.prepare(graph_path, root, RunMode::Build)?;
        self.execute(graph_path, prepared, progress)
    }

    /// Classify changes without recomputing or writing anything
    pub fn plan(&self, graph_path: &Path, root: &Path) -> Result<UpdatePlan, UpdateError> {
        let mode = if self.options.force_full {
            RunMode::Forced
        } else {
            RunMode::Incremental
        };
        Ok(self.prepare(graph_path, root, mode)?.plan)
    }

    /// Stages LoadGraph, LoadState and DetectChanges
    fn prepare(&self, graph_path: &Path, root: &Path, requested: RunMode) -> Result<Prepared, UpdateError> {
        let state_path = state_path_for(graph_path);

        // 0. Open the project; the graph and state never count as project files
        let mut scan_options = self.options.scan.clone();
        scan_options.exclude_paths.push(graph_path.to_path_buf());
        scan_options.exclude_paths.push(state_path.clone());
        let scanner = FingerprintScanner::new(root, scan_options).map_err(UpdateError::Project)?;

        // 1. LoadGraph
        debug!("Stage: {}", Stage::LoadGraph);
        let graph = if requested == RunMode::Build {
            Graph::new()
        } else {
            self.graphs
                .load(graph_path)
                .map_err(|source| UpdateError::Graph {
                    stage: Stage::LoadGraph,
                    source,
                })?
        };

        // 2. LoadState (best effort)
        debug!("Stage: {}", Stage::LoadState);
        let (mode, previous, fallback_cause) = match requested {
            RunMode::Incremental => match self.states.load(&state_path) {
                Ok(state) => (RunMode::Incremental, Some(state), None),
                Err(e) => {
                    warn!("{}; falling back to full analysis", e);
                    (RunMode::Fallback, None, Some(e.to_string()))
                }
            },
            other => (other, None, None),
        };

        // 3. DetectChanges
        debug!("Stage: {}", Stage::DetectChanges);
        let scan = scanner.scan().map_err(|source| UpdateError::Scan {
            stage: Stage::DetectChanges,
            source,
        })?;
        let changes = diff(previous.as_ref().map(|s| &s.fingerprints), &scan.fingerprints);

        // Owners the scan no longer sees and no state remembers as deleted
        let scanned: BTreeSet<&str> = scan.paths().collect();
        let deleted: BTreeSet<&str> = changes.deleted.iter().map(String::as_str).collect();
        let orphans: Vec<String> = graph
            .owners()
            .filter(|owner| !scanned.contains(owner) && !deleted.contains(owner))
            .map(str::to_string)
            .collect();
        if !orphans.is_empty() {
            warn!(
                "{} graph owners were not found in the project and are kept as-is",
                orphans.len()
            );
        }

        let counts = changes.counts();
        info!(
            "Detected changes ({}): {} changed, {} new, {} deleted, {} unchanged",
            mode.label(),
            counts.changed,
            counts.new,
            counts.deleted,
            counts.unchanged
        );

        let plan = UpdatePlan {
            mode,
            fallback_cause,
            changes,
            orphans,
            skipped: scan.skipped,
            previous_run: previous.as_ref().map(|s| s.timestamp),
        };

        Ok(Prepared {
            graph,
            previous,
            fingerprints: scan.fingerprints,
            plan,
            root: scanner.root().to_path_buf(),
        })
    }

    /// Stages Reconcile and Persist
    fn execute(
        &self,
        graph_path: &Path,
        prepared: Prepared,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Result<UpdateOutcome, UpdateError> {
        let Prepared {
            graph,
            previous,
            fingerprints,
            plan,
            root,
        } = prepared;
        let state_path = state_path_for(graph_path);

        // 4. Reconcile
        debug!("Stage: {}", Stage::Reconcile);
        let pool = RecomputePool::new(self.options.workers).map_err(|source| UpdateError::Workers {
            stage: Stage::Reconcile,
            source,
        })?;
        let outcome = Reconciler::new(self.options.policy)
            .with_pool(pool)
            .apply_with_progress(graph, &plan.changes, self.analyzer, progress);

        // 5. Persist: graph first, state only once the graph is safely written
        debug!("Stage: {}", Stage::Persist);
        self.graphs
            .save(&outcome.graph, graph_path)
            .map_err(|source| UpdateError::Graph {
                stage: Stage::Persist,
                source,
            })?;

        let record = RunRecord::new(plan.mode, &plan.changes, outcome.errors.len());
        let fingerprints = retry_failed(fingerprints, &outcome.errors, previous.as_ref(), self.options.policy);
        let state = self.next_state(&root, previous.as_ref(), fingerprints, &plan.changes, &record);
        self.states
            .save(&state_path, &state)
            .map_err(|source| UpdateError::State {
                stage: Stage::Persist,
                source,
            })?;

        info!(
            "Updated {}: {} facts across {} files ({} errors)",
            graph_path.display(),
            outcome.graph.fact_count(),
            outcome.graph.owner_count(),
            outcome.errors.len()
        );

        Ok(UpdateOutcome {
            mode: plan.mode,
            fallback_cause: plan.fallback_cause,
            changes: plan.changes,
            errors: outcome.errors,
            stats: outcome.stats,
            orphans: plan.orphans,
            skipped: plan.skipped,
            fact_count: outcome.graph.fact_count(),
            owner_count: outcome.graph.owner_count(),
            record,
            graph_path: graph_path.to_path_buf(),
            state_path,
        })
    }

    /// Build the replacement state snapshot
    fn next_state(
        &self,
        root: &Path,
        previous: Option<&AnalysisState>,
        fingerprints: Vec<FileFingerprint>,
        changes: &ChangeSet,
        record: &RunRecord,
    ) -> AnalysisState {
        let mut project = ProjectDescriptor::for_root(root);
        if let Some(name) = &self.options.project_name {
            project.name = name.clone();
        }
        project.version = self.options.project_version.clone();

        let mut state = AnalysisState::new(project, fingerprints);
        state
            .metadata
            .insert("analyzer".to_string(), self.analyzer.name().into());

        let mut history = previous.map(AnalysisState::history).unwrap_or_default();
        history.push(record.clone());
        let dropped = self.options.retention.apply(&mut history);
        if dropped > 0 {
            debug!("Pruned {} old run records", dropped);
        }
        state.set_history(&history);

        if self.options.track_files {
            let mut files = previous.map(AnalysisState::file_history).unwrap_or_default();
            record_changes(&mut files, changes, record.ts_unix_ms);
            state.set_file_history(&files);
        }

        state
    }
}

/// Fingerprints to persist so that every failed path is retried next run
///
/// A failed path normally loses its fingerprint and comes back as `new`.
/// When `Restore` put its previous facts back, the previous fingerprint is
/// kept instead so the path comes back as `changed`.
fn retry_failed(
    fingerprints: Vec<FileFingerprint>,
    errors: &[FileError],
    previous: Option<&AnalysisState>,
    policy: ChangedFailurePolicy,
) -> Vec<FileFingerprint> {
    if errors.is_empty() {
        return fingerprints;
    }

    let failed: BTreeSet<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    fingerprints
        .into_iter()
        .filter_map(|fp| {
            if !failed.contains(fp.path.as_str()) {
                return Some(fp);
            }
            match policy {
                ChangedFailurePolicy::Drop => None,
                ChangedFailurePolicy::Restore => previous
                    .and_then(|state| state.fingerprints.get(&fp.path))
                    .cloned(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisError, FnAnalyzer};
    use gl_core::{Fact, FactSet, JsonGraphStore};
    use std::fs;
    use tempfile::TempDir;

    fn module_analyzer() -> impl Analyzer {
        FnAnalyzer::new(|path: &str| Ok(FactSet::from([Fact::new(path, "type", "Module")])))
    }

    #[test]
    fn test_missing_graph_is_fatal_at_load_graph() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonGraphStore::new();
        let analyzer = module_analyzer();
        let driver = UpdateDriver::new(&store, &analyzer, UpdateOptions::default());

        let err = driver
            .update(&temp_dir.path().join("missing.json"), temp_dir.path())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::LoadGraph));
    }

    #[test]
    fn test_missing_root_is_fatal_before_any_stage() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonGraphStore::new();
        let analyzer = module_analyzer();
        let driver = UpdateDriver::new(&store, &analyzer, UpdateOptions::default());

        let err = driver
            .build(&temp_dir.path().join("g.json"), &temp_dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, UpdateError::Project(ScanError::RootMissing(_))));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_graph_write_failure_skips_state() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.py"), "x = 1\n").unwrap();

        // The graph's parent is a regular file
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let graph_path = blocker.join("g.json");
        let store = JsonGraphStore::new();
        let analyzer = module_analyzer();
        let driver = UpdateDriver::new(&store, &analyzer, UpdateOptions::default());

        let err = driver.build(&graph_path, &root).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Persist));
        assert!(matches!(err, UpdateError::Graph { .. }));
        assert!(!state_path_for(&graph_path).exists());
    }

    #[test]
    fn test_state_write_failure_is_fatal_at_persist() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.py"), "x = 1\n").unwrap();

        // A directory sits where the state file goes
        let graph_path = temp_dir.path().join("g.json");
        fs::create_dir_all(state_path_for(&graph_path)).unwrap();
        let store = JsonGraphStore::new();
        let analyzer = module_analyzer();
        let driver = UpdateDriver::new(&store, &analyzer, UpdateOptions::default());

        let err = driver.build(&graph_path, &root).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Persist));
        assert!(matches!(err, UpdateError::State { .. }));
        // Graph is written first
        assert!(graph_path.is_file());
    }

    #[test]
    fn test_retry_failed_fingerprints() {
        let current = vec![
            FileFingerprint::new("a", 200, 1),
            FileFingerprint::new("b", 200, 1),
            FileFingerprint::new("c", 200, 1),
        ];
        let previous = AnalysisState::new(
            ProjectDescriptor::for_root(Path::new("proj")),
            [FileFingerprint::new("b", 100, 1)],
        );
        let errors = vec![FileError::new("b", "bad"), FileError::new("c", "bad")];

        let dropped = retry_failed(current.clone(), &errors, Some(&previous), ChangedFailurePolicy::Drop);
        assert_eq!(dropped, vec![FileFingerprint::new("a", 200, 1)]);

        // c had no previous fingerprint, so it is dropped either way
        let restored = retry_failed(current.clone(), &errors, Some(&previous), ChangedFailurePolicy::Restore);
        assert_eq!(
            restored,
            vec![FileFingerprint::new("a", 200, 1), FileFingerprint::new("b", 100, 1)]
        );

        assert_eq!(retry_failed(current.clone(), &[], None, ChangedFailurePolicy::Drop), current);
    }

    #[test]
    fn test_errors_do_not_abort_persist() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("ok.py"), "x = 1\n").unwrap();
        fs::write(root.join("bad.py"), "def (\n").unwrap();

        let graph_path = temp_dir.path().join("g.json");
        let store = JsonGraphStore::new();
        let analyzer = FnAnalyzer::new(|path: &str| {
            if path == "bad.py" {
                Err(AnalysisError::rejected("syntax_error"))
            } else {
                Ok(FactSet::from([Fact::new(path, "type", "Module")]))
            }
        });
        let driver = UpdateDriver::new(&store, &analyzer, UpdateOptions::default());

        let outcome = driver.build(&graph_path, &root).unwrap();
        assert_eq!(outcome.mode, RunMode::Build);
        assert_eq!(outcome.errors, vec![FileError::new("bad.py", "syntax_error")]);
        assert!(graph_path.exists());
        assert!(outcome.state_path.exists());
        assert_eq!(outcome.record.errors, 1);
    }
}
