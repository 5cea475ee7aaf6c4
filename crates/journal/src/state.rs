//! Analysis state snapshot
//!
//! The state records what the last successful run saw: one fingerprint per
//! tracked file plus a free-form metadata bag. It lives beside the graph as
//! `<graph file>.state.json`:
//!
//! ```text
//! {
//!   "version": "1.0",
//!   "project": {"path": "/repo", "name": "repo", "version": null},
//!   "files": [{"path": "src/a.py", "mtime": 1700000000000000000, "size": 120}],
//!   "metadata": {"file_count": 1, "last_analysis": "2024-01-01T00:00:00.000Z"}
//! }
//! ```
//!
//! A missing or unreadable state is never fatal: callers fall back to a full
//! run and report the cause.

use crate::files::{FileHistory, FILE_HISTORY_KEY};
use crate::history::{RunRecord, HISTORY_KEY};
use chrono::{DateTime, SecondsFormat, Utc};
use gl_core::atomic_write;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use watcher::{FileFingerprint, FingerprintMap};

/// Current state document format version
pub const STATE_FORMAT_VERSION: &str = "1.0";

/// Suffix appended to the graph file name
const STATE_SUFFIX: &str = ".state.json";

const FILE_COUNT_KEY: &str = "file_count";
const LAST_ANALYSIS_KEY: &str = "last_analysis";

/// Errors loading or saving analysis state
#[derive(Debug, Error)]
pub enum StateError {
    /// No state file exists yet
    #[error("no analysis state at {}", .0.display())]
    NotFound(PathBuf),

    /// The state file exists but cannot be trusted
    #[error("corrupt analysis state at {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The state file exists but could not be read
    #[error("cannot read analysis state at {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing the state failed
    #[error("failed to write analysis state to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StateError {
    /// Short label for why a run fell back to full analysis
    pub fn fallback_cause(&self) -> &'static str {
        match self {
            StateError::NotFound(_) => "no previous state",
            StateError::Corrupt { .. } => "corrupt state",
            StateError::Unreadable { .. } => "unreadable state",
            StateError::Io { .. } => "state I/O error",
        }
    }

    fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        StateError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Identity of the analyzed project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Project root as given to the run
    pub path: String,
    /// Display name (defaults to the root directory name)
    pub name: String,
    /// Optional project version
    #[serde(default)]
    pub version: Option<String>,
}

impl ProjectDescriptor {
    /// Describe the project rooted at `root`
    pub fn for_root(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        Self {
            path: root.display().to_string(),
            name,
            version: None,
        }
    }
}

/// Snapshot of the last successful run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisState {
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    pub project: ProjectDescriptor,
    pub fingerprints: FingerprintMap,
    /// Free-form metadata (run history, file history, caller data)
    pub metadata: Map<String, Value>,
}

impl AnalysisState {
    /// Create a state stamped with the current time
    pub fn new(project: ProjectDescriptor, fingerprints: impl IntoIterator<Item = FileFingerprint>) -> Self {
        Self {
            timestamp: Utc::now(),
            project,
            fingerprints: fingerprints
                .into_iter()
                .map(|fp| (fp.path.clone(), fp))
                .collect(),
            metadata: Map::new(),
        }
    }

    /// Replace the metadata bag
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of tracked files
    pub fn file_count(&self) -> usize {
        self.fingerprints.len()
    }

    /// Run records stored in the metadata, oldest first
    ///
    /// A malformed history is dropped with a warning; it never invalidates
    /// the fingerprints.
    pub fn history(&self) -> Vec<RunRecord> {
        match self.metadata.get(HISTORY_KEY) {
            None => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Ignoring malformed run history: {}", e);
                Vec::new()
            }),
        }
    }

    /// Store run records in the metadata
    pub fn set_history(&mut self, records: &[RunRecord]) {
        match serde_json::to_value(records) {
            Ok(value) => {
                self.metadata.insert(HISTORY_KEY.to_string(), value);
            }
            Err(e) => warn!("Failed to encode run history: {}", e),
        }
    }

    /// Per-file revision history stored in the metadata
    pub fn file_history(&self) -> FileHistory {
        match self.metadata.get(FILE_HISTORY_KEY) {
            None => FileHistory::new(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Ignoring malformed file history: {}", e);
                FileHistory::new()
            }),
        }
    }

    /// Store per-file revision history in the metadata
    pub fn set_file_history(&mut self, history: &FileHistory) {
        match serde_json::to_value(history) {
            Ok(value) => {
                self.metadata.insert(FILE_HISTORY_KEY.to_string(), value);
            }
            Err(e) => warn!("Failed to encode file history: {}", e),
        }
    }

    /// Remove per-file revision history
    pub fn clear_file_history(&mut self) {
        self.metadata.remove(FILE_HISTORY_KEY);
    }
}

/// Path of the state file belonging to `graph`
pub fn state_path_for(graph: &Path) -> PathBuf {
    let mut name = graph
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(STATE_SUFFIX);
    graph.with_file_name(name)
}

/// On-disk state document
#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    version: String,
    project: ProjectDescriptor,
    #[serde(default)]
    files: Vec<FileFingerprint>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// Reads and writes [`AnalysisState`] files
#[derive(Debug, Clone, Default)]
pub struct AnalysisStateStore;

impl AnalysisStateStore {
    pub fn new() -> Self {
        Self
    }

    /// Load the state at `path`
    pub fn load(&self, path: &Path) -> Result<AnalysisState, StateError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StateError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(StateError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let state = self.decode(path, &bytes)?;
        debug!(
            "Loaded analysis state from {} ({} files)",
            path.display(),
            state.file_count()
        );
        Ok(state)
    }

    /// Atomically replace the state at `path`
    pub fn save(&self, path: &Path, state: &AnalysisState) -> Result<(), StateError> {
        let bytes = self.encode(state).map_err(|e| StateError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        atomic_write(path, &bytes).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Saved analysis state to {} ({} files)",
            path.display(),
            state.file_count()
        );
        Ok(())
    }

    /// Encode a state into document bytes
    pub fn encode(&self, state: &AnalysisState) -> Result<Vec<u8>, serde_json::Error> {
        let mut metadata = state.metadata.clone();
        metadata.insert(FILE_COUNT_KEY.to_string(), Value::from(state.file_count()));
        metadata.insert(
            LAST_ANALYSIS_KEY.to_string(),
            Value::from(state.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let doc = StateDocument {
            version: STATE_FORMAT_VERSION.to_string(),
            project: state.project.clone(),
            files: state.fingerprints.values().cloned().collect(),
            metadata,
        };

        let mut bytes = serde_json::to_vec_pretty(&doc)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Decode document bytes read from `path`
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<AnalysisState, StateError> {
        let doc: StateDocument = serde_json::from_slice(bytes)
            .map_err(|e| StateError::corrupt(path, e.to_string()))?;

        if major(&doc.version) != major(STATE_FORMAT_VERSION) {
            return Err(StateError::corrupt(
                path,
                format!("unsupported version {}", doc.version),
            ));
        }

        let timestamp = doc
            .metadata
            .get(LAST_ANALYSIS_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| StateError::corrupt(path, "missing last_analysis timestamp"))
            .and_then(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| StateError::corrupt(path, format!("bad last_analysis: {}", e)))
            })?;

        let mut fingerprints = FingerprintMap::new();
        for fp in doc.files {
            if fp.path.is_empty() {
                return Err(StateError::corrupt(path, "empty file path"));
            }
            if let Some(dup) = fingerprints.insert(fp.path.clone(), fp) {
                return Err(StateError::corrupt(
                    path,
                    format!("duplicate path {}", dup.path),
                ));
            }
        }

        let mut metadata = doc.metadata;
        metadata.remove(FILE_COUNT_KEY);
        metadata.remove(LAST_ANALYSIS_KEY);

        Ok(AnalysisState {
            timestamp,
            project: doc.project,
            fingerprints,
            metadata,
        })
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
