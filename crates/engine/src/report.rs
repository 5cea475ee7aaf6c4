//! Run report helpers

use crate::driver::UpdateOutcome;
use crate::reconcile::FileError;

/// Per-file errors listed before truncating
pub const DEFAULT_ERROR_LIMIT: usize = 10;

/// Summary of a finished run
///
/// Per-file errors are listed up to `error_limit`; the rest are counted
/// for a `+K more` line.
pub struct UpdateReport<'a> {
    outcome: &'a UpdateOutcome,
    error_limit: usize,
}

impl<'a> UpdateReport<'a> {
    pub fn new(outcome: &'a UpdateOutcome) -> Self {
        Self {
            outcome,
            error_limit: DEFAULT_ERROR_LIMIT,
        }
    }

    /// Set how many per-file errors are listed (at least one)
    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = limit.max(1);
        self
    }

    /// Errors shown in the listing
    pub fn shown_errors(&self) -> &'a [FileError] {
        let errors = &self.outcome.errors;
        &errors[..errors.len().min(self.error_limit)]
    }

    /// Errors left out of the listing
    pub fn hidden_errors(&self) -> usize {
        self.outcome.errors.len().saturating_sub(self.error_limit)
    }

    /// One-line per-class counts
    pub fn summary_line(&self) -> String {
        let counts = self.outcome.changes.counts();
        format!(
            "{} changed, {} new, {} deleted, {} unchanged",
            counts.changed, counts.new, counts.deleted, counts.unchanged
        )
    }
}
