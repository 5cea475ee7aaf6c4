//! Graphlapse command-line support library
//!
//! Shared by the `gl` binary and its integration tests.

pub mod config;
pub mod util;
