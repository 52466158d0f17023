//! Derived lookup tables over a graph's nodes and edges
//!
//! The index is never authoritative: it holds positions into the graph's
//! ordered node and edge maps and is rebuilt from scratch whenever it is read
//! after a structural mutation.

use crate::edge::{Edge, EdgeId};
use crate::node::{Node, NodeDetails, NodeId};
use indexmap::IndexMap;
use std::cell::{Cell, OnceCell};
use std::collections::HashMap;

/// Attributes covered by the value index. Other attributes are looked up by scan.
pub const INDEXED_ATTRIBUTES: [&str; 4] = ["original_id", "graph_id", "property_type", "URI"];

/// Lookup key for an attribute value, if the value is a scalar
pub(crate) fn attribute_key(node: &Node, name: &str) -> Option<String> {
    match node.attributes.get(name) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(_) => None,
        None => match (&node.details, name) {
            (
                NodeDetails::Property {
                    property_type: Some(t),
                    ..
                },
                "property_type",
            ) => Some(t.clone()),
            _ => None,
        },
    }
}

/// Snapshot of the lookup tables, valid until the next mutation
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphIndex {
    nodes_by_kind: HashMap<String, Vec<usize>>,
    edges_by_kind: HashMap<String, Vec<usize>>,
    edges_by_source: HashMap<String, Vec<usize>>,
    edges_by_target: HashMap<String, Vec<usize>>,
    nodes_by_attribute: HashMap<&'static str, HashMap<String, Vec<usize>>>,
}

impl GraphIndex {
    /// Full rebuild: one pass over nodes, one over edges
    pub(crate) fn build(nodes: &IndexMap<NodeId, Node>, edges: &IndexMap<EdgeId, Edge>) -> Self {
        let mut index = GraphIndex::default();

        for (pos, node) in nodes.values().enumerate() {
            index
                .nodes_by_kind
                .entry(node.kind.as_str().to_string())
                .or_default()
                .push(pos);

            for name in INDEXED_ATTRIBUTES {
                if let Some(key) = attribute_key(node, name) {
                    index
                        .nodes_by_attribute
                        .entry(name)
                        .or_default()
                        .entry(key)
                        .or_default()
                        .push(pos);
                }
            }
        }

        for (pos, edge) in edges.values().enumerate() {
            index
                .edges_by_kind
                .entry(edge.kind.as_str().to_string())
                .or_default()
                .push(pos);
            index
                .edges_by_source
                .entry(edge.source.as_str().to_string())
                .or_default()
                .push(pos);
            index
                .edges_by_target
                .entry(edge.target.as_str().to_string())
                .or_default()
                .push(pos);
        }

        index
    }

    pub(crate) fn nodes_of_kind(&self, kind: &str) -> &[usize] {
        self.nodes_by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn node_kinds(&self) -> impl Iterator<Item = (&str, usize)> {
        self.nodes_by_kind.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    pub(crate) fn edges_of_kind(&self, kind: &str) -> &[usize] {
        self.edges_by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn edge_kinds(&self) -> impl Iterator<Item = (&str, usize)> {
        self.edges_by_kind.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    pub(crate) fn edges_from(&self, node: &str) -> &[usize] {
        self.edges_by_source.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn edges_to(&self, node: &str) -> &[usize] {
        self.edges_by_target.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `None` when `name` is not an indexed attribute
    pub(crate) fn nodes_with_attribute(&self, name: &str, value: &str) -> Option<&[usize]> {
        if !INDEXED_ATTRIBUTES.contains(&name) {
            return None;
        }
        Some(
            self.nodes_by_attribute
                .get(name)
                .and_then(|values| values.get(value))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        )
    }
}

/// Lazily rebuilt index: empty means dirty
///
/// Mutations need `&mut self` to invalidate, reads only `&self`, so a stale
/// snapshot can never be observed through the accessor.
#[derive(Debug, Clone, Default)]
pub(crate) struct LazyIndex {
    snapshot: OnceCell<GraphIndex>,
    rebuilds: Cell<usize>,
}

impl LazyIndex {
    /// Current index, rebuilding first if a mutation happened since the last read
    pub(crate) fn get(
        &self,
        nodes: &IndexMap<NodeId, Node>,
        edges: &IndexMap<EdgeId, Edge>,
    ) -> &GraphIndex {
        self.snapshot.get_or_init(|| {
            self.rebuilds.set(self.rebuilds.get() + 1);
            tracing::debug!(
                "Rebuilding graph index: {} nodes, {} edges",
                nodes.len(),
                edges.len()
            );
            GraphIndex::build(nodes, edges)
        })
    }

    pub(crate) fn invalidate(&mut self) {
        self.snapshot.take();
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.snapshot.get().is_none()
    }

    pub(crate) fn rebuilds(&self) -> usize {
        self.rebuilds.get()
    }
}
