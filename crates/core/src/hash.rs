//! BLAKE3 content hashing for content-mode fingerprints

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

/// Files above this size are hashed through a memory map
const MMAP_THRESHOLD: u64 = 4 * 1024 * 1024;

/// A BLAKE3 content hash (32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a hash from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Lowercase hex encoding, as stored in fingerprints
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hash bytes using BLAKE3
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_bytes(*blake3::hash(data).as_bytes())
}

/// Hash a file's content
///
/// Small files are streamed; large files go through a memory map.
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let len = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let mut hasher = blake3::Hasher::new();
    if len > MMAP_THRESHOLD {
        hasher
            .update_mmap(path)
            .with_context(|| format!("Failed to map {}", path.display()))?;
    } else {
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        std::io::copy(&mut file, &mut hasher)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }

    Ok(ContentHash::from_bytes(*hasher.finalize().as_bytes()))
}
