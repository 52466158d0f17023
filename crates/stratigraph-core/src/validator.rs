//! Connection validation
//!
//! Composes node resolution with schema admissibility so adapters can check
//! an edge before attempting to insert it.

use crate::error::{Endpoint, Error};
use crate::graph::Graph;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

/// Outcome of validating a prospective edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Admissible,
    MissingEndpoint {
        node_id: String,
        endpoint: Endpoint,
    },
    SchemaViolation {
        source_kind: String,
        edge_kind: String,
        target_kind: String,
    },
}

impl Verdict {
    pub fn is_admissible(&self) -> bool {
        matches!(self, Verdict::Admissible)
    }

    /// Convert a rejection into the error reported for `edge_id`
    pub fn into_result(self, edge_id: &str) -> Result<(), Error> {
        match self {
            Verdict::Admissible => Ok(()),
            Verdict::MissingEndpoint { node_id, endpoint } => Err(Error::MissingEndpoint {
                edge_id: edge_id.to_string(),
                node_id,
                endpoint,
            }),
            Verdict::SchemaViolation {
                source_kind,
                edge_kind,
                target_kind,
            } => Err(Error::SchemaViolation {
                edge_id: edge_id.to_string(),
                source_kind,
                edge_kind,
                target_kind,
            }),
        }
    }
}

/// Validates connections against a schema
#[derive(Debug, Clone, Copy)]
pub struct ConnectionValidator<'s> {
    schema: &'s Schema,
}

impl<'s> ConnectionValidator<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Kind-level check, no graph involved
    pub fn validate_connection(&self, source_kind: &str, target_kind: &str, edge_kind: &str) -> bool {
        self.schema.is_admissible(source_kind, target_kind, edge_kind)
    }

    /// Resolve both endpoints in `graph`, then check their kinds.
    /// A missing source is reported before a missing target.
    pub fn check(&self, graph: &Graph, source_id: &str, target_id: &str, edge_kind: &str) -> Verdict {
        let Some(source) = graph.find_node_by_id(source_id) else {
            return Verdict::MissingEndpoint {
                node_id: source_id.to_string(),
                endpoint: Endpoint::Source,
            };
        };
        let Some(target) = graph.find_node_by_id(target_id) else {
            return Verdict::MissingEndpoint {
                node_id: target_id.to_string(),
                endpoint: Endpoint::Target,
            };
        };

        let (source_kind, target_kind) = (source.kind.as_str(), target.kind.as_str());
        if self.validate_connection(source_kind, target_kind, edge_kind) {
            Verdict::Admissible
        } else {
            tracing::debug!(
                "Rejected {} -[{}]-> {}: {} -> {} not allowed",
                source_id,
                edge_kind,
                target_id,
                source_kind,
                target_kind
            );
            Verdict::SchemaViolation {
                source_kind: source_kind.to_string(),
                edge_kind: edge_kind.to_string(),
                target_kind: target_kind.to_string(),
            }
        }
    }
}

/// Check a kind triple against the builtin schema
pub fn validate_connection(source_kind: &str, target_kind: &str, edge_kind: &str) -> bool {
    let schema = Schema::builtin();
    ConnectionValidator::new(&schema).validate_connection(source_kind, target_kind, edge_kind)
}
