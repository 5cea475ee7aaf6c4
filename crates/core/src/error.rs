//! Graph persistence errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or saving a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph file does not exist
    #[error("graph file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The graph file exists but could not be read
    #[error("failed to read graph {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The graph file is not a valid graph document
    #[error("graph {} is not valid: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The graph file was written by an incompatible format version
    #[error("unsupported graph format version '{found}' in {}", path.display())]
    UnsupportedVersion { path: PathBuf, found: String },

    /// The graph could not be encoded
    #[error("failed to encode graph: {0}")]
    Encode(#[source] serde_json::Error),

    /// The graph could not be written
    #[error("failed to write graph {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
