//! Core data model for Graphlapse
//!
//! This crate provides:
//! - Facts (subject/predicate/object triples)
//! - The fact graph with its per-file provenance index
//! - Graph persistence (`GraphStore`, JSON store, atomic writes)
//! - BLAKE3 content hashing for optional content fingerprints

pub mod error;
pub mod fact;
pub mod graph;
pub mod hash;
pub mod store;

// Re-exports
pub use error::GraphError;
pub use fact::{Fact, FactSet};
pub use graph::Graph;
pub use hash::{hash_bytes, hash_file, ContentHash};
pub use store::{atomic_write, normalize_path, GraphStore, JsonGraphStore, GRAPH_FORMAT_VERSION};
