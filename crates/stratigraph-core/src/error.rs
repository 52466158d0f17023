//! Error types for Stratigraph Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using Stratigraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Which end of an edge a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Source,
    Target,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Source => write!(f, "source"),
            Endpoint::Target => write!(f, "target"),
        }
    }
}

/// Stratigraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Edge {edge_id}: {endpoint} node '{node_id}' does not exist")]
    MissingEndpoint {
        edge_id: String,
        node_id: String,
        endpoint: Endpoint,
    },

    #[error("Edge {edge_id}: connection {source_kind} -[{edge_kind}]-> {target_kind} is not allowed")]
    SchemaViolation {
        edge_id: String,
        source_kind: String,
        edge_kind: String,
        target_kind: String,
    },

    #[error("Batch rejected: {} edge(s) failed validation", failures.len())]
    BatchRejected { failures: Vec<(String, Error)> },

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Graph already registered: {0}")]
    GraphExists(String),

    #[error("No default graph: {count} graphs registered")]
    NoDefaultGraph { count: usize },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for the failures that reject a single edge insertion
    pub fn is_edge_rejection(&self) -> bool {
        matches!(self, Error::MissingEndpoint { .. } | Error::SchemaViolation { .. })
    }
}
