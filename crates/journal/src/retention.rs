//! Retention of run records

use crate::history::RunRecord;

/// Retention policy configuration
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Number of run records to keep (default: 100)
    pub retain_runs: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { retain_runs: 100 }
    }
}

impl RetentionPolicy {
    pub fn new(retain_runs: usize) -> Self {
        Self { retain_runs }
    }

    /// Drop the oldest records beyond the limit, returning how many were dropped
    ///
    /// Records are kept in append order; the newest are at the end.
    pub fn apply(&self, records: &mut Vec<RunRecord>) -> usize {
        let excess = records.len().saturating_sub(self.retain_runs);
        records.drain(..excess);
        excess
    }
}
