//! Analyzer interface
//!
//! An analyzer turns one project file into the set of facts that file owns.
//! It must be pure per file: the same path and content always produce the
//! same facts, and it never touches the graph. That is what allows recompute
//! calls to run on a worker pool.

use gl_core::FactSet;
use std::io;
use thiserror::Error;

/// Why a file's facts could not be recomputed
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The file could not be read
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid UTF-8 text
    #[error("not valid UTF-8")]
    NotUtf8,

    /// The file exceeds the analyzer's size limit
    #[error("file too large ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    /// The analyzer rejected the content
    #[error("{0}")]
    Rejected(String),
}

impl AnalysisError {
    /// Rejection with a free-form reason
    pub fn rejected(reason: impl Into<String>) -> Self {
        AnalysisError::Rejected(reason.into())
    }
}

/// Recompute callback: project-relative path to owned facts
pub trait Analyzer: Send + Sync {
    /// Compute the facts owned by `path`
    fn analyze(&self, path: &str) -> Result<FactSet, AnalysisError>;

    /// Short name recorded in run metadata
    fn name(&self) -> &str {
        "custom"
    }
}

/// Analyzer backed by a closure
pub struct FnAnalyzer<F> {
    func: F,
}

impl<F> FnAnalyzer<F>
where
    F: Fn(&str) -> Result<FactSet, AnalysisError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Analyzer for FnAnalyzer<F>
where
    F: Fn(&str) -> Result<FactSet, AnalysisError> + Send + Sync,
{
    fn analyze(&self, path: &str) -> Result<FactSet, AnalysisError> {
        (self.func)(path)
    }
}

impl<A: Analyzer + ?Sized> Analyzer for Box<A> {
    fn analyze(&self, path: &str) -> Result<FactSet, AnalysisError> {
        (**self).analyze(path)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gl_core::Fact;

    #[test]
    fn test_fn_analyzer_delegates() {
        let analyzer = FnAnalyzer::new(|path: &str| {
            if path.ends_with(".bad") {
                Err(AnalysisError::rejected("syntax_error"))
            } else {
                Ok(FactSet::from([Fact::new(path, "type", "Module")]))
            }
        });

        assert_eq!(analyzer.analyze("a.py").unwrap().len(), 1);
        let err = analyzer.analyze("x.bad").unwrap_err();
        assert_eq!(err.to_string(), "syntax_error");
        assert_eq!(analyzer.name(), "custom");
    }
}
