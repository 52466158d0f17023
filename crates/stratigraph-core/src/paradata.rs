//! Paradata chains
//!
//! The documentation trail behind a node: its properties, the combiners and
//! extractors those properties were derived from, and the source documents.

use crate::edge::Direction;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::traversal::{TraversalEngine, TraversalQuery, TraversalStats};
use serde::Serialize;

/// Depth used by [`Graph::paradata_chain`]
pub const DEFAULT_PARADATA_DEPTH: u32 = 5;

/// Edge kinds followed when collecting a chain
pub const PARADATA_EDGE_KINDS: [&str; 5] = [
    "has_property",
    "has_data_provenance",
    "combines",
    "extracted_from",
    "has_documentation",
];

/// Nodes reached from a start node through documentation edges, by kind
#[derive(Debug, Clone, Serialize)]
pub struct ParadataChain<'g> {
    pub start: &'g NodeId,
    pub properties: Vec<&'g Node>,
    pub combiners: Vec<&'g Node>,
    pub extractors: Vec<&'g Node>,
    pub documents: Vec<&'g Node>,
    pub stats: TraversalStats,
}

impl<'g> ParadataChain<'g> {
    /// Follow outgoing documentation edges from `node_id` up to `max_depth` hops
    pub fn collect(graph: &'g Graph, node_id: &str, max_depth: u32) -> Result<Self> {
        let start = graph
            .find_node_by_id(node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))?;

        let query = TraversalQuery::new(node_id)
            .with_direction(Direction::Outgoing)
            .with_depth(max_depth)
            .filter_edge_kinds(PARADATA_EDGE_KINDS);
        let result = TraversalEngine::execute(&query, graph)?;

        let mut chain = Self {
            start: &start.id,
            properties: Vec::new(),
            combiners: Vec::new(),
            extractors: Vec::new(),
            documents: Vec::new(),
            stats: result.stats,
        };

        for id in result.visited.iter().skip(1) {
            let Some(node) = graph.find_node_by_id(id.as_str()) else {
                continue;
            };
            match node.kind {
                NodeKind::Property => chain.properties.push(node),
                NodeKind::Combiner => chain.combiners.push(node),
                NodeKind::Extractor => chain.extractors.push(node),
                NodeKind::Document => chain.documents.push(node),
                _ => {}
            }
        }

        tracing::debug!(
            "Paradata chain of {}: {} properties, {} combiners, {} extractors, {} documents",
            node_id,
            chain.properties.len(),
            chain.combiners.len(),
            chain.extractors.len(),
            chain.documents.len()
        );
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.properties.len() + self.combiners.len() + self.extractors.len() + self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every collected node, bucket by bucket
    pub fn nodes(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.properties
            .iter()
            .chain(&self.combiners)
            .chain(&self.extractors)
            .chain(&self.documents)
            .copied()
    }
}
