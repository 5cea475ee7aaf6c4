//! CLI command implementations

pub mod build;
pub mod config;
pub mod history;
pub mod status;
pub mod update;
