//! Workflow integration tests
//!
//! Tests for complete workflows that exercise multiple commands
//! and validate end-to-end behavior.

pub mod build_update;
pub mod edge_cases;
pub mod inspect;
