//! File change detection for Graphlapse
//!
//! This crate provides:
//! - Cheap per-file fingerprints (path, mtime, size, optional content hash)
//! - A filesystem scanner honoring built-in, .gitignore and .glignore rules
//! - Four-way change classification between two fingerprint sets

pub mod changes;
pub mod fingerprint;
pub mod ignore;
pub mod scanner;

// Re-exports
pub use changes::{diff, ChangeCounts, ChangeKind, ChangeSet};
pub use fingerprint::{FileFingerprint, FingerprintMap};
pub use crate::ignore::{IgnoreConfig, IgnoreRules};
pub use scanner::{scan, FingerprintMode, FingerprintScanner, ScanError, ScanOptions, ScanOutput};
