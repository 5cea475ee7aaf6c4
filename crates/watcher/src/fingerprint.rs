//! File fingerprints

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::Metadata;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fingerprints keyed by project-relative path
pub type FingerprintMap = BTreeMap<String, FileFingerprint>;

/// Cheap change proxy for one file
///
/// `mtime` is nanoseconds since the Unix epoch (negative before it).
/// `hash` is only populated in content fingerprint mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub path: String,
    pub mtime: i64,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl FileFingerprint {
    /// Create a metadata-only fingerprint
    pub fn new(path: impl Into<String>, mtime: i64, size: u64) -> Self {
        Self {
            path: path.into(),
            mtime,
            size,
            hash: None,
        }
    }

    /// Attach a content hash
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Build a fingerprint from filesystem metadata
    pub fn from_metadata(path: impl Into<String>, metadata: &Metadata) -> io::Result<Self> {
        Ok(Self::new(path, mtime_nanos(metadata.modified()?), metadata.len()))
    }

    /// Whether `other` (a later observation of the same path) means the file changed
    ///
    /// A size difference always counts. When both sides carry a content
    /// hash the hashes decide, otherwise any mtime difference counts. This
    /// errs toward recomputing: clock skew or a bare touch reports a change.
    pub fn differs_from(&self, other: &FileFingerprint) -> bool {
        if self.size != other.size {
            return true;
        }

        match (&self.hash, &other.hash) {
            (Some(a), Some(b)) => a != b,
            _ => self.mtime != other.mtime,
        }
    }
}

/// Convert a timestamp into signed nanoseconds since the Unix epoch
pub fn mtime_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos())
            .map(|n| -n)
            .unwrap_or(i64::MIN),
    }
}

/// Index fingerprints by path (later duplicates win)
pub fn index(fingerprints: &[FileFingerprint]) -> FingerprintMap {
    fingerprints
        .iter()
        .map(|fp| (fp.path.clone(), fp.clone()))
        .collect()
}
