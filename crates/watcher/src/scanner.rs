//! Fingerprint scanner
//!
//! Walks a project tree and records a fingerprint for every tracked file.
//! The scan never reads file content unless content fingerprints are
//! requested.

use crate::fingerprint::FileFingerprint;
use crate::ignore::{IgnoreConfig, IgnoreRules};
use ::ignore::overrides::{Override, OverrideBuilder};
use gl_core::{hash_file, normalize_path};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors that abort a scan
#[derive(Debug, Error)]
pub enum ScanError {
    /// The project root does not exist
    #[error("project root not found: {}", .0.display())]
    RootMissing(PathBuf),

    /// The project root is not a directory
    #[error("project root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// An include glob could not be compiled
    #[error("invalid include pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ::ignore::Error,
    },

    /// Ignore files could not be loaded
    #[error("failed to load ignore rules: {0}")]
    IgnoreRules(#[source] anyhow::Error),

    /// Root could not be resolved
    #[error("failed to resolve {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How file identity is fingerprinted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Modification time and size only
    #[default]
    Metadata,
    /// Metadata plus a BLAKE3 hash of the content
    Content,
}

/// Scan configuration
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Gitignore-style globs selecting files to track (empty = all files)
    pub include: Vec<String>,
    /// Ignore sources
    pub ignore: IgnoreConfig,
    /// Fingerprint mode
    pub mode: FingerprintMode,
    /// Files never tracked, such as the graph and its state file
    pub exclude_paths: Vec<PathBuf>,
}

/// Result of one scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    /// Fingerprints sorted by path, one per tracked file
    pub fingerprints: Vec<FileFingerprint>,
    /// Entries that could not be fingerprinted, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

impl ScanOutput {
    /// Tracked paths in order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fingerprints.iter().map(|fp| fp.path.as_str())
    }
}

/// Filesystem scanner producing fingerprints
pub struct FingerprintScanner {
    /// Canonical project root
    root: PathBuf,
    rules: IgnoreRules,
    include: Override,
    mode: FingerprintMode,
    /// Root-relative paths excluded from every scan
    excluded: Vec<String>,
}

impl FingerprintScanner {
    /// Prepare a scanner for `root`
    ///
    /// Fails if the root is missing or the include globs are invalid.
    pub fn new(root: &Path, options: ScanOptions) -> Result<Self, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootMissing(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let root = root.canonicalize().map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let rules = IgnoreRules::load(&root, options.ignore).map_err(ScanError::IgnoreRules)?;

        let mut builder = OverrideBuilder::new(&root);
        for pattern in &options.include {
            builder
                .add(pattern)
                .map_err(|source| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
        }
        let include = builder.build().map_err(|source| ScanError::InvalidPattern {
            pattern: options.include.join(","),
            source,
        })?;

        let excluded = options
            .exclude_paths
            .iter()
            .filter_map(|p| relative_to(&root, p))
            .collect();

        Ok(Self {
            root,
            rules,
            include,
            mode: options.mode,
            excluded,
        })
    }

    /// Canonical project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the project and fingerprint every tracked file
    ///
    /// Symlinks are never followed (no cycles) and are not tracked.
    /// Unreadable entries are reported in `skipped` rather than failing the
    /// scan.
    pub fn scan(&self) -> Result<ScanOutput, ScanError> {
        let mut output = ScanOutput::default();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                match e.path().strip_prefix(&self.root) {
                    Ok(rel) => !self.rules.should_ignore(rel, e.file_type().is_dir()),
                    Err(_) => false,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    output.skipped.push((path, e.to_string()));
                    continue;
                }
            };

            // Only regular files (symlinks and directories are skipped)
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };

            let path = match normalize_path(rel) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    output.skipped.push((entry.path().to_path_buf(), e.to_string()));
                    continue;
                }
            };

            if self.excluded.contains(&path) || self.include.matched(rel, false).is_ignore() {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => match FileFingerprint::from_metadata(path, &metadata) {
                    Ok(fp) => output.fingerprints.push(fp),
                    Err(e) => output.skipped.push((entry.path().to_path_buf(), e.to_string())),
                },
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    output.skipped.push((entry.path().to_path_buf(), e.to_string()));
                }
            }
        }

        output.fingerprints.sort_by(|a, b| a.path.cmp(&b.path));

        if self.mode == FingerprintMode::Content {
            self.attach_hashes(&mut output.fingerprints);
        }

        info!(
            "Scanned {}: {} files tracked, {} skipped",
            self.root.display(),
            output.fingerprints.len(),
            output.skipped.len()
        );

        Ok(output)
    }

    /// Hash file content in parallel
    ///
    /// A file that cannot be hashed keeps `hash = None`, so change detection
    /// falls back to its metadata.
    fn attach_hashes(&self, fingerprints: &mut [FileFingerprint]) {
        fingerprints.par_iter_mut().for_each(|fp| {
            match hash_file(&self.root.join(&fp.path)) {
                Ok(hash) => fp.hash = Some(hash.to_hex()),
                Err(e) => debug!("No content hash for {}: {:#}", fp.path, e),
            }
        });
    }
}

/// Scan `root` for files matching `include_globs` (metadata fingerprints)
pub fn scan(root: &Path, include_globs: &[String]) -> Result<Vec<FileFingerprint>, ScanError> {
    let options = ScanOptions {
        include: include_globs.to_vec(),
        ..ScanOptions::default()
    };
    Ok(FingerprintScanner::new(root, options)?.scan()?.fingerprints)
}

/// Express `path` relative to `root` if it lies inside it
///
/// `path` need not exist yet; its parent is canonicalized when possible.
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let resolved = match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or(absolute.clone()),
        _ => absolute,
    };

    let rel = resolved.strip_prefix(root).ok()?;
    normalize_path(rel).ok()
}
