//! Incremental graph update engine
//!
//! This crate provides:
//! - The analyzer interface used to recompute one file's facts
//! - A regex-based structural analyzer for common languages
//! - Retract-then-insert reconciliation of a graph against a change set
//! - A bounded worker pool for recompute calls
//! - The update driver that runs one load/diff/reconcile/persist cycle
//! - Run reports with capped per-file error listings

pub mod analyzer;
pub mod driver;
pub mod outline;
pub mod pool;
pub mod reconcile;
pub mod report;

// Re-exports
pub use analyzer::{AnalysisError, Analyzer, FnAnalyzer};
pub use driver::{Stage, UpdateDriver, UpdateError, UpdateOptions, UpdateOutcome, UpdatePlan};
pub use journal::RunMode;
pub use outline::OutlineAnalyzer;
pub use pool::RecomputePool;
pub use reconcile::{ChangedFailurePolicy, FileError, ReconcileOutcome, ReconcileStats, Reconciler};
pub use report::{UpdateReport, DEFAULT_ERROR_LIMIT};
