//! CLI command implementations

pub mod completions;
pub mod config;
pub mod graph;
pub mod schema;
