//! Stratigraph Core - Typed property-graph engine
//!
//! This crate provides the node/edge model, the schema that constrains which
//! edge kinds may connect which node kinds, graphs with a lazily rebuilt
//! index, and a registry for holding several graphs at once.

pub mod edge;
pub mod error;
pub mod graph;
mod index;
pub mod node;
pub mod paradata;
pub mod prefix;
pub mod registry;
pub mod schema;
pub mod traversal;
pub mod validator;

pub use edge::{Direction, Edge, EdgeId, EdgeKind};
pub use error::{Endpoint, Error, Result};
pub use graph::{BatchReport, GeoReference, Graph, GraphMetadata, GraphStats, MergeReport};
pub use index::INDEXED_ATTRIBUTES;
pub use node::{EpochSpan, Node, NodeDetails, NodeId, NodeKind, StratigraphicType};
pub use paradata::{ParadataChain, DEFAULT_PARADATA_DEPTH, PARADATA_EDGE_KINDS};
pub use prefix::{add_graph_prefix, graph_code_of, strip_graph_prefix};
pub use registry::GraphRegistry;
pub use schema::{EdgeDirection, EdgeKindDef, NodeKindDef, Schema, SchemaBuilder, Sockets};
pub use traversal::{
    GraphPath, PathEdge, TraversalEngine, TraversalQuery, TraversalResult, TraversalStats,
    MAX_TRAVERSAL_DEPTH,
};
pub use validator::{validate_connection, ConnectionValidator, Verdict};
