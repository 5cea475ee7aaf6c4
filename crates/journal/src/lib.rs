//! Analysis state and run history
//!
//! This crate provides:
//! - The analysis state snapshot persisted beside a graph
//! - Atomic load/save of that snapshot with fallback-friendly errors
//! - Run records (ULID-based IDs) kept in the state metadata
//! - Per-file revision history
//! - Retention of run records

pub mod files;
pub mod history;
pub mod retention;
pub mod state;

// Re-exports
pub use files::{record_changes, FileHistory, FileRevision};
pub use history::{RunMode, RunRecord, MAX_TOUCHED_PATHS};
pub use retention::RetentionPolicy;
pub use state::{
    state_path_for, AnalysisState, AnalysisStateStore, ProjectDescriptor, StateError,
    STATE_FORMAT_VERSION,
};
