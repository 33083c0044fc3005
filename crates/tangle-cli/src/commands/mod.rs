//! CLI command implementations.

pub mod artifacts;
pub mod config;
pub mod schedule;
pub mod version;
