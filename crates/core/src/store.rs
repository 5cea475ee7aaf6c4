//! Graph persistence
//!
//! The update engine treats graph storage as a collaborator: anything that
//! can load and save a [`Graph`] implements [`GraphStore`]. The bundled
//! [`JsonGraphStore`] keeps facts grouped by owning file so provenance
//! survives across runs:
//!
//! ```text
//! {
//!   "version": "1.0",
//!   "owners": {
//!     "src/b.py": [["B", "type", "Module"], ["B", "hasFunction", "F"]]
//!   }
//! }
//! ```

use crate::error::GraphError;
use crate::fact::FactSet;
use crate::graph::Graph;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path};

/// Current graph document format version
pub const GRAPH_FORMAT_VERSION: &str = "1.0";

/// Load/save interface for persisted graphs
pub trait GraphStore: Send + Sync {
    /// Load the graph at `path`
    fn load(&self, path: &Path) -> Result<Graph, GraphError>;

    /// Persist `graph` to `path`
    ///
    /// Implementations must not leave a partially written graph behind.
    fn save(&self, graph: &Graph, path: &Path) -> Result<(), GraphError>;
}

/// On-disk graph document
#[derive(Debug, Serialize, Deserialize)]
struct GraphDocument {
    version: String,
    #[serde(default)]
    owners: BTreeMap<String, FactSet>,
}

/// JSON graph store
#[derive(Debug, Clone)]
pub struct JsonGraphStore {
    pretty: bool,
}

impl JsonGraphStore {
    /// Create a store writing indented JSON
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Create a store writing single-line JSON
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    /// Encode a graph into document bytes
    pub fn encode(&self, graph: &Graph) -> Result<Vec<u8>, GraphError> {
        let doc = GraphDocument {
            version: GRAPH_FORMAT_VERSION.to_string(),
            owners: graph.as_owners().clone(),
        };

        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(&doc)
        } else {
            serde_json::to_vec(&doc)
        }
        .map_err(GraphError::Encode)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Decode document bytes read from `path`
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Graph, GraphError> {
        let doc: GraphDocument = serde_json::from_slice(bytes).map_err(|source| GraphError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if major_version(&doc.version) != major_version(GRAPH_FORMAT_VERSION) {
            return Err(GraphError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: doc.version,
            });
        }

        Ok(Graph::from_owners(doc.owners))
    }
}

impl Default for JsonGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for JsonGraphStore {
    fn load(&self, path: &Path) -> Result<Graph, GraphError> {
        let bytes = fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                GraphError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GraphError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let graph = self.decode(path, &bytes)?;
        tracing::debug!(
            "Loaded graph {} ({} owners, {} facts)",
            path.display(),
            graph.owner_count(),
            graph.fact_count()
        );
        Ok(graph)
    }

    fn save(&self, graph: &Graph, path: &Path) -> Result<(), GraphError> {
        let bytes = self.encode(graph)?;
        atomic_write(path, &bytes).map_err(|source| GraphError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Saved graph {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Atomic write helper
///
/// Writes data to a temporary file beside `target`, fsyncs it, then renames
/// it over the target and fsyncs the parent directory. Readers see either the
/// old content or the new content, never a torn write.
pub fn atomic_write(target: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp_path, target)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return result;
    }

    sync_dir(parent);
    Ok(())
}

/// Best-effort directory fsync so the rename itself is durable
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Normalize a project-relative path for storage
///
/// - Converts to a relative path with `/` separators
/// - Rejects `..`, absolute paths and non-UTF-8 components
/// - Removes `./` components
pub fn normalize_path(path: &Path) -> Result<String> {
    let mut parts = Vec::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| anyhow::anyhow!("Non UTF-8 path: {}", path.display()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => anyhow::bail!("Path escapes project root: {}", path.display()),
            Component::RootDir | Component::Prefix(_) => {
                anyhow::bail!("Absolute path not allowed: {}", path.display())
            }
        }
    }

    if parts.is_empty() {
        anyhow::bail!("Empty path");
    }

    Ok(parts.join("/"))
}
