//! The graph: nodes, edges, warnings and a lazily rebuilt index

use crate::edge::{Direction, Edge, EdgeId, EdgeKind};
use crate::error::{Error, Result};
use crate::index::{attribute_key, GraphIndex, LazyIndex};
use crate::node::{Node, NodeId, NodeKind};
use crate::paradata::{ParadataChain, DEFAULT_PARADATA_DEPTH};
use crate::schema::Schema;
use crate::traversal::{TraversalEngine, TraversalQuery, TraversalResult};
use crate::validator::{ConnectionValidator, Verdict};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Geographic reference of a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    pub epsg: u32,
    #[serde(default)]
    pub shift_x: f64,
    #[serde(default)]
    pub shift_y: f64,
    #[serde(default)]
    pub shift_z: f64,
}

/// Free-form graph-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_reference: Option<GeoReference>,

    /// Anything an adapter wants to carry along
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
}

/// Outcome of a lenient edge batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Edges inserted by this batch
    pub added: Vec<EdgeId>,

    /// Ids that already existed; each produced a warning
    pub skipped: Vec<EdgeId>,

    /// Rejected edges with the reason
    pub failed: Vec<(EdgeId, Error)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of merging one graph into another
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub nodes_added: usize,
    pub nodes_skipped: usize,
    pub edges_added: usize,
    pub edges_skipped: usize,
    pub edges_failed: usize,
}

/// Graph statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub warnings: usize,
    pub nodes_by_kind: BTreeMap<String, usize>,
    pub edges_by_kind: BTreeMap<String, usize>,
}

/// A typed property graph
///
/// Nodes and edges live in insertion-ordered maps keyed by id. Every
/// structural mutation goes through `&mut self` and invalidates the index;
/// index-served queries take `&self` and rebuild on first use.
#[derive(Debug, Clone)]
pub struct Graph {
    id: String,
    metadata: GraphMetadata,
    schema: Arc<Schema>,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    warnings: Vec<String>,
    index: LazyIndex,
}

impl Graph {
    /// Create an empty graph validated against the builtin schema
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_schema(id, Schema::builtin())
    }

    /// Create an empty graph validated against `schema`
    pub fn with_schema(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            id: id.into(),
            metadata: GraphMetadata::default(),
            schema,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            warnings: Vec::new(),
            index: LazyIndex::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: GraphMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, falling back to the id
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or(&self.id)
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a non-fatal diagnostic
    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(graph = %self.id, "{}", message);
        self.warnings.push(message);
    }

    /// Warnings in the order they were recorded
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether the next index-served query will trigger a rebuild
    pub fn is_index_stale(&self) -> bool {
        self.index.is_stale()
    }

    /// Number of index rebuilds performed so far
    pub fn index_rebuilds(&self) -> usize {
        self.index.rebuilds()
    }

    fn index(&self) -> &GraphIndex {
        self.index.get(&self.nodes, &self.edges)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a node. An existing node with the same id is kept, a warning is
    /// recorded and the existing node is returned.
    pub fn add_node(&mut self, node: Node) -> &Node {
        let (pos, inserted) = self.put_node(node, false);
        if inserted {
            self.index.invalidate();
        }
        &self.nodes[pos]
    }

    /// Insert a node, replacing any node with the same id in place.
    /// Edges referencing it are left untouched.
    pub fn replace_node(&mut self, node: Node) -> &Node {
        let (pos, _) = self.put_node(node, true);
        self.index.invalidate();
        &self.nodes[pos]
    }

    /// Insert many nodes with `add_node` semantics, invalidating the index once.
    /// Returns the number of nodes actually inserted.
    pub fn add_nodes_batch(&mut self, nodes: impl IntoIterator<Item = Node>) -> usize {
        let mut inserted = 0;
        for node in nodes {
            if self.put_node(node, false).1 {
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.index.invalidate();
        }
        tracing::debug!("Node batch on {}: {} inserted", self.id, inserted);
        inserted
    }

    fn put_node(&mut self, node: Node, overwrite: bool) -> (usize, bool) {
        if !overwrite {
            if let Some(pos) = self.nodes.get_index_of(node.id.as_str()) {
                self.add_warning(format!("Node '{}' already exists, insertion skipped", node.id));
                return (pos, false);
            }
        }
        let (pos, _) = self.nodes.insert_full(node.id.clone(), node);
        (pos, true)
    }

    /// Direct lookup, independent of the index
    pub fn find_node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// First node with the given display name, in insertion order
    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Modify a node in place. The id cannot be changed this way.
    pub fn update_node(&mut self, id: &str, f: impl FnOnce(&mut Node)) -> Result<&Node> {
        let (pos, key, node) = self
            .nodes
            .get_full_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        f(node);
        node.id = key.clone();
        self.index.invalidate();
        Ok(&self.nodes[pos])
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;

        let before = self.edges.len();
        self.edges.retain(|_, edge| !edge.touches(id));
        tracing::debug!(
            "Removed node {} and {} dependent edges",
            id,
            before - self.edges.len()
        );

        self.index.invalidate();
        Ok(node)
    }

    /// Nodes of exactly this kind, in insertion order
    pub fn nodes_by_type(&self, kind: &str) -> Vec<&Node> {
        self.index()
            .nodes_of_kind(kind)
            .iter()
            .filter_map(|&pos| self.nodes.get_index(pos).map(|(_, n)| n))
            .collect()
    }

    /// Nodes whose kind descends from `family` in the schema hierarchy
    pub fn nodes_by_family(&self, family: &str) -> Vec<&Node> {
        let index = self.index();
        let mut positions: Vec<usize> = index
            .node_kinds()
            .filter(|(kind, _)| self.schema.is_kind_of(kind, family))
            .flat_map(|(kind, _)| index.nodes_of_kind(kind).iter().copied())
            .collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .filter_map(|pos| self.nodes.get_index(pos).map(|(_, n)| n))
            .collect()
    }

    /// Nodes whose attribute `name` equals `value`.
    /// Served from the index for the indexed attribute set, by scan otherwise.
    pub fn nodes_with_attribute(&self, name: &str, value: &str) -> Vec<&Node> {
        if let Some(positions) = self.index().nodes_with_attribute(name, value) {
            return positions
                .iter()
                .filter_map(|&pos| self.nodes.get_index(pos).map(|(_, n)| n))
                .collect();
        }
        self.nodes
            .values()
            .filter(|n| attribute_key(n, name).as_deref() == Some(value))
            .collect()
    }

    /// Epoch nodes ordered by start
    pub fn epochs(&self) -> Vec<&Node> {
        let mut epochs: Vec<(f64, &Node)> = self
            .nodes_by_type(NodeKind::Epoch.as_str())
            .into_iter()
            .filter_map(|n| n.epoch_span().map(|span| (span.start, n)))
            .collect();
        epochs.sort_by(|a, b| a.0.total_cmp(&b.0));
        epochs.into_iter().map(|(_, n)| n).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edge operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and insert an edge.
    ///
    /// Both endpoints must exist and the kind triple must be admissible;
    /// otherwise nothing is inserted. A duplicate id records a warning and
    /// returns the existing edge.
    pub fn add_edge(
        &mut self,
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        kind: impl Into<EdgeKind>,
    ) -> Result<&Edge> {
        self.insert_edge(Edge::new(id, source, target, kind))
    }

    /// Insert a prebuilt edge with `add_edge` semantics
    pub fn insert_edge(&mut self, edge: Edge) -> Result<&Edge> {
        let (pos, inserted) = self.put_edge(edge)?;
        if inserted {
            self.index.invalidate();
        }
        Ok(&self.edges[pos])
    }

    /// Insert edges independently of each other, invalidating the index once.
    ///
    /// A rejected edge never stops the batch: it is reported in
    /// [`BatchReport::failed`] and recorded as a warning.
    pub fn add_edges_batch(&mut self, edges: impl IntoIterator<Item = Edge>) -> BatchReport {
        let mut report = BatchReport::default();

        for edge in edges {
            let id = edge.id.clone();
            match self.put_edge(edge) {
                Ok((_, true)) => report.added.push(id),
                Ok((_, false)) => report.skipped.push(id),
                Err(e) => {
                    self.add_warning(e.to_string());
                    report.failed.push((id, e));
                }
            }
        }

        if !report.added.is_empty() {
            self.index.invalidate();
        }
        tracing::info!(
            "Edge batch on {}: {} added, {} skipped, {} failed",
            self.id,
            report.added.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    /// All-or-nothing variant of [`Graph::add_edges_batch`]: every edge is
    /// validated first and nothing is applied if any of them is rejected.
    pub fn add_edges_batch_strict(&mut self, edges: Vec<Edge>) -> Result<BatchReport> {
        let validator = ConnectionValidator::new(&self.schema);
        // Ids the lenient pass would insert; later rows with these ids are skipped there too
        let mut accepted: HashSet<&str> = HashSet::new();
        let mut failures: Vec<(String, Error)> = Vec::new();

        for edge in &edges {
            let id = edge.id.as_str();
            if self.edges.contains_key(id) || accepted.contains(id) {
                continue;
            }
            match validator
                .check(self, edge.source.as_str(), edge.target.as_str(), edge.kind.as_str())
                .into_result(id)
            {
                Ok(()) => {
                    accepted.insert(id);
                }
                Err(e) => failures.push((id.to_string(), e)),
            }
        }

        if !failures.is_empty() {
            tracing::info!(
                "Strict edge batch on {} rejected: {} of {} edges invalid",
                self.id,
                failures.len(),
                edges.len()
            );
            return Err(Error::BatchRejected { failures });
        }

        Ok(self.add_edges_batch(edges))
    }

    fn put_edge(&mut self, mut edge: Edge) -> Result<(usize, bool)> {
        if let Some(pos) = self.edges.get_index_of(edge.id.as_str()) {
            self.add_warning(format!("Edge '{}' already exists, insertion skipped", edge.id));
            return Ok((pos, false));
        }

        self.check_connection(edge.source.as_str(), edge.target.as_str(), edge.kind.as_str())
            .into_result(edge.id.as_str())?;

        if let Some(def) = self.schema.edge_kind(edge.kind.as_str()) {
            if edge.label.is_none() {
                edge.label = Some(def.label.clone());
            }
            if edge.description.is_none() && !def.description.is_empty() {
                edge.description = Some(def.description.clone());
            }
        }

        let (pos, _) = self.edges.insert_full(edge.id.clone(), edge);
        Ok((pos, true))
    }

    pub fn find_edge_by_id(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Modify an edge. A change of endpoints or kind is validated like an
    /// insertion and leaves the edge unchanged when rejected.
    pub fn update_edge(&mut self, id: &str, f: impl FnOnce(&mut Edge)) -> Result<&Edge> {
        let (pos, _, current) = self
            .edges
            .get_full(id)
            .ok_or_else(|| Error::EdgeNotFound(id.to_string()))?;

        let mut updated = current.clone();
        f(&mut updated);
        updated.id = current.id.clone();

        let rewired = updated.source != current.source
            || updated.target != current.target
            || updated.kind != current.kind;
        if rewired {
            self.check_connection(
                updated.source.as_str(),
                updated.target.as_str(),
                updated.kind.as_str(),
            )
            .into_result(id)?;
        }

        self.edges[pos] = updated;
        self.index.invalidate();
        Ok(&self.edges[pos])
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        let edge = self
            .edges
            .shift_remove(id)
            .ok_or_else(|| Error::EdgeNotFound(id.to_string()))?;
        self.index.invalidate();
        Ok(edge)
    }

    pub fn edges_by_type(&self, kind: &str) -> Vec<&Edge> {
        self.edges_at(self.index().edges_of_kind(kind))
    }

    /// Edges whose source is `node`
    pub fn edges_from(&self, node: &str) -> Vec<&Edge> {
        self.edges_at(self.index().edges_from(node))
    }

    /// Edges whose target is `node`
    pub fn edges_to(&self, node: &str) -> Vec<&Edge> {
        self.edges_at(self.index().edges_to(node))
    }

    /// Edges touching `node` in the given direction. Self-loops appear once.
    pub fn edges_of(&self, node: &str, direction: Direction) -> Vec<&Edge> {
        match direction {
            Direction::Outgoing => self.edges_from(node),
            Direction::Incoming => self.edges_to(node),
            Direction::Both => {
                let index = self.index();
                let mut positions: Vec<usize> = index
                    .edges_from(node)
                    .iter()
                    .chain(index.edges_to(node))
                    .copied()
                    .collect();
                positions.sort_unstable();
                positions.dedup();
                self.edges_at(&positions)
            }
        }
    }

    fn edges_at(&self, positions: &[usize]) -> Vec<&Edge> {
        positions
            .iter()
            .filter_map(|&pos| self.edges.get_index(pos).map(|(_, e)| e))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation and derived queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Kind-level admissibility against this graph's schema
    pub fn validate_connection(&self, source_kind: &str, target_kind: &str, edge_kind: &str) -> bool {
        self.schema.is_admissible(source_kind, target_kind, edge_kind)
    }

    /// Resolve both endpoints and check the connection without inserting anything
    pub fn check_connection(&self, source_id: &str, target_id: &str, edge_kind: &str) -> Verdict {
        ConnectionValidator::new(&self.schema).check(self, source_id, target_id, edge_kind)
    }

    pub fn traverse(&self, query: &TraversalQuery) -> Result<TraversalResult> {
        TraversalEngine::execute(query, self)
    }

    /// Paradata chain of `node_id` with the default depth
    pub fn paradata_chain(&self, node_id: &str) -> Result<ParadataChain<'_>> {
        self.paradata_chain_with_depth(node_id, DEFAULT_PARADATA_DEPTH)
    }

    pub fn paradata_chain_with_depth(&self, node_id: &str, max_depth: u32) -> Result<ParadataChain<'_>> {
        ParadataChain::collect(self, node_id, max_depth)
    }

    pub fn stats(&self) -> GraphStats {
        let index = self.index();
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            warnings: self.warnings.len(),
            nodes_by_kind: index
                .node_kinds()
                .map(|(k, n)| (k.to_string(), n))
                .collect(),
            edges_by_kind: index
                .edge_kinds()
                .map(|(k, n)| (k.to_string(), n))
                .collect(),
        }
    }

    /// Copy every node and edge of `other` into this graph.
    ///
    /// Duplicate ids and rejected edges become warnings on this graph;
    /// whatever was merged before a failure stays merged.
    pub fn merge_from(&mut self, other: &Graph) -> MergeReport {
        tracing::debug!("Merging graph {} into {}", other.id, self.id);

        let nodes_added = self.add_nodes_batch(other.nodes().cloned());
        let batch = self.add_edges_batch(other.edges().cloned());

        MergeReport {
            nodes_added,
            nodes_skipped: other.node_count() - nodes_added,
            edges_added: batch.added.len(),
            edges_skipped: batch.skipped.len(),
            edges_failed: batch.failed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::StratigraphicType;

    fn unit_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .edge("precedes", &["unit"], &["unit"])
                .build()
                .unwrap(),
        )
    }

    fn unit_graph() -> Graph {
        let mut graph = Graph::with_schema("g", unit_schema());
        graph.add_node(Node::new("A", "unit"));
        graph.add_node(Node::new("B", "unit"));
        graph.add_node(Node::new("C", "document"));
        graph
    }

    #[test]
    fn test_admissible_edge() {
        let mut graph = unit_graph();
        graph.add_edge("e1", "A", "B", "precedes").unwrap();

        let from_a = graph.edges_from("A");
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].target.as_str(), "B");
        assert_eq!(graph.edges_to("B").len(), 1);
    }

    #[test]
    fn test_inadmissible_edge_leaves_graph_unchanged() {
        let mut graph = unit_graph();
        let err = graph.add_edge("e1", "A", "C", "precedes").unwrap_err();

        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edges_from("A").is_empty());
        assert!(graph.find_edge_by_id("e1").is_none());
    }

    #[test]
    fn test_missing_endpoint() {
        let mut graph = unit_graph();

        let err = graph.add_edge("e1", "A", "Z", "precedes").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingEndpoint { endpoint: crate::error::Endpoint::Target, .. }
        ));

        let err = graph.add_edge("e2", "Z", "A", "precedes").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingEndpoint { endpoint: crate::error::Endpoint::Source, .. }
        ));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_unknown_edge_kind_rejected() {
        let mut graph = unit_graph();
        let err = graph.add_edge("e1", "A", "B", "follows").unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
    }

    #[test]
    fn test_duplicate_node_warns() {
        let mut graph = Graph::with_schema("g", unit_schema());
        graph.add_node(Node::new("A", "unit").with_name("first"));
        let existing = graph.add_node(Node::new("A", "unit").with_name("second"));

        assert_eq!(existing.name, "first");
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.warnings().len(), 1);
    }

    #[test]
    fn test_replace_node_keeps_edges() {
        let mut graph = unit_graph();
        graph.add_edge("e1", "A", "B", "precedes").unwrap();
        graph.replace_node(Node::new("A", "unit").with_name("renamed"));

        assert_eq!(graph.find_node_by_id("A").unwrap().name, "renamed");
        assert_eq!(graph.edges_from("A").len(), 1);
        assert!(graph.warnings().is_empty());
        // position is kept
        assert_eq!(graph.nodes().next().unwrap().id.as_str(), "A");
    }

    #[test]
    fn test_duplicate_edge_returns_existing() {
        let mut graph = unit_graph();
        graph.add_edge("e1", "A", "B", "precedes").unwrap();
        let edge = graph.add_edge("e1", "B", "A", "precedes").unwrap();

        assert_eq!(edge.source.as_str(), "A");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.warnings().len(), 1);
    }

    #[test]
    fn test_edge_label_from_schema() {
        let mut graph = Graph::new("g");
        graph.add_node(Node::stratigraphic("US1", StratigraphicType::Us));
        graph.add_node(Node::stratigraphic("US2", StratigraphicType::Us));
        let edge = graph.add_edge("e1", "US2", "US1", "is_after").unwrap();
        assert!(edge.label.is_some());

        let edge = graph
            .insert_edge(Edge::new("e2", "US1", "US2", "is_before").with_label("custom"))
            .unwrap();
        assert_eq!(edge.label.as_deref(), Some("custom"));
    }

    #[test]
    fn test_index_tracks_mutations() {
        let mut graph = unit_graph();
        assert_eq!(graph.nodes_by_type("unit").len(), 2);
        assert!(!graph.is_index_stale());

        graph.add_node(Node::new("D", "unit"));
        assert!(graph.is_index_stale());
        assert_eq!(graph.nodes_by_type("unit").len(), 3);

        graph.remove_node("A").unwrap();
        let ids: Vec<&str> = graph
            .nodes_by_type("unit")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "D"]);
    }

    #[test]
    fn test_batch_invalidates_once() {
        let mut graph = Graph::with_schema("g", unit_schema());
        graph.nodes_by_type("unit");
        let rebuilds = graph.index_rebuilds();

        let inserted = graph.add_nodes_batch((0..50).map(|i| Node::new(format!("n{i}"), "unit")));
        assert_eq!(inserted, 50);
        assert_eq!(graph.nodes_by_type("unit").len(), 50);
        graph.edges_from("n0");
        assert_eq!(graph.index_rebuilds(), rebuilds + 1);
    }

    #[test]
    fn test_lenient_edge_batch() {
        let mut graph = unit_graph();
        let report = graph.add_edges_batch(vec![
            Edge::new("e1", "A", "B", "precedes"),
            Edge::new("e2", "A", "C", "precedes"),
            Edge::new("e3", "A", "Q", "precedes"),
            Edge::new("e1", "B", "A", "precedes"),
            Edge::new("e4", "B", "A", "precedes"),
        ]);

        let added: Vec<&str> = report.added.iter().map(EdgeId::as_str).collect();
        assert_eq!(added, vec!["e1", "e4"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|(_, e)| e.is_edge_rejection()));
        // two rejections plus one duplicate
        assert_eq!(graph.warnings().len(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_strict_edge_batch() {
        let mut graph = unit_graph();
        let err = graph
            .add_edges_batch_strict(vec![
                Edge::new("e1", "A", "B", "precedes"),
                Edge::new("e2", "A", "C", "precedes"),
            ])
            .unwrap_err();

        match err {
            Error::BatchRejected { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "e2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(graph.edge_count(), 0);

        let report = graph
            .add_edges_batch_strict(vec![Edge::new("e1", "A", "B", "precedes")])
            .unwrap();
        assert_eq!(report.added.len(), 1);
    }

    #[test]
    fn test_strict_edge_batch_repeated_id() {
        let batch = vec![
            Edge::new("e1", "A", "B", "precedes"),
            Edge::new("e1", "A", "C", "precedes"),
        ];

        let mut lenient = unit_graph();
        let expected = lenient.add_edges_batch(batch.clone());
        assert!(expected.is_clean());

        let mut strict = unit_graph();
        let report = strict.add_edges_batch_strict(batch).unwrap();
        assert_eq!(report.added, expected.added);
        assert_eq!(report.skipped, expected.skipped);
        assert_eq!(strict.find_edge_by_id("e1").unwrap().target.as_str(), "B");
        assert_eq!(strict.warnings(), lenient.warnings());
    }

    #[test]
    fn test_strict_edge_batch_repeated_id_after_failure() {
        // The first row fails, so the second row with the same id is judged on its own
        let mut graph = unit_graph();
        let err = graph
            .add_edges_batch_strict(vec![
                Edge::new("e1", "A", "C", "precedes"),
                Edge::new("e1", "A", "B", "precedes"),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::BatchRejected { ref failures } if failures.len() == 1));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_edge_batch_rebuilds_once() {
        let mut graph = Graph::with_schema("g", unit_schema());
        graph.add_nodes_batch((0..20).map(|i| Node::new(format!("n{i}"), "unit")));
        graph.add_node(Node::new("doc", "document"));
        graph.edges_from("n0");
        let rebuilds = graph.index_rebuilds();

        let mut edges: Vec<Edge> = (0..19)
            .map(|i| Edge::new(format!("e{i}"), format!("n{i}"), format!("n{}", i + 1), "precedes"))
            .collect();
        edges.push(Edge::new("bad1", "n0", "doc", "precedes"));
        edges.push(Edge::new("bad2", "n0", "missing", "precedes"));
        let report = graph.add_edges_batch(edges);
        assert_eq!(report.added.len(), 19);
        assert_eq!(report.failed.len(), 2);

        assert_eq!(graph.edges_by_type("precedes").len(), 19);
        assert_eq!(graph.edges_from("n0").len(), 1);
        assert_eq!(graph.edges_to("n19").len(), 1);
        assert_eq!(graph.index_rebuilds(), rebuilds + 1);
    }

    #[test]
    fn test_strict_edge_batch_rebuilds_once() {
        let mut graph = unit_graph();
        graph.edges_from("A");
        let rebuilds = graph.index_rebuilds();

        let rejected = graph.add_edges_batch_strict(vec![
            Edge::new("e1", "A", "B", "precedes"),
            Edge::new("e2", "A", "C", "precedes"),
        ]);
        assert!(rejected.is_err());
        graph.edges_from("A");
        assert_eq!(graph.index_rebuilds(), rebuilds);

        graph
            .add_edges_batch_strict(vec![
                Edge::new("e1", "A", "B", "precedes"),
                Edge::new("e2", "B", "A", "precedes"),
            ])
            .unwrap();
        assert_eq!(graph.edges_from("A").len(), 1);
        assert_eq!(graph.edges_by_type("precedes").len(), 2);
        assert_eq!(graph.index_rebuilds(), rebuilds + 1);
    }

    #[test]
    fn test_merge_rebuilds_once() {
        let mut target = unit_graph();
        target.nodes_by_type("unit");
        let rebuilds = target.index_rebuilds();

        let mut source = Graph::with_schema("src", unit_schema());
        for id in ["A", "X", "Y", "Z"] {
            source.add_node(Node::new(id, "unit"));
        }
        source.add_edge("s1", "X", "Y", "precedes").unwrap();
        source.add_edge("s2", "Y", "Z", "precedes").unwrap();
        source.add_edge("s3", "A", "X", "precedes").unwrap();

        let report = target.merge_from(&source);
        assert_eq!(report.nodes_added, 3);
        assert_eq!(report.edges_added, 3);

        assert_eq!(target.nodes_by_type("unit").len(), 5);
        assert_eq!(target.edges_from("A").len(), 1);
        assert_eq!(target.index_rebuilds(), rebuilds + 1);
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = unit_graph();
        graph.add_edge("e1", "A", "B", "precedes").unwrap();
        graph.add_edge("e2", "B", "A", "precedes").unwrap();

        let removed = graph.remove_node("B").unwrap();
        assert_eq!(removed.id.as_str(), "B");
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edges_from("A").is_empty());
        assert!(matches!(graph.remove_node("B"), Err(Error::NodeNotFound(_))));
    }

    #[test]
    fn test_update_node_keeps_id() {
        let mut graph = unit_graph();
        let node = graph
            .update_node("A", |n| {
                n.set_attribute("original_id", "x1");
                n.id = NodeId::new("hijacked");
            })
            .unwrap();
        assert_eq!(node.id.as_str(), "A");
        assert_eq!(graph.nodes_with_attribute("original_id", "x1").len(), 1);
    }

    #[test]
    fn test_update_edge_revalidates() {
        let mut graph = unit_graph();
        graph.add_edge("e1", "A", "B", "precedes").unwrap();

        let err = graph
            .update_edge("e1", |e| e.target = NodeId::new("C"))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert_eq!(graph.find_edge_by_id("e1").unwrap().target.as_str(), "B");

        graph
            .update_edge("e1", |e| e.description = Some("checked".into()))
            .unwrap();
        assert_eq!(
            graph.find_edge_by_id("e1").unwrap().description.as_deref(),
            Some("checked")
        );
    }

    #[test]
    fn test_attribute_lookup() {
        let mut graph = unit_graph();
        graph.update_node("A", |n| {
            n.set_attribute("original_id", "n0");
            n.set_attribute("y_pos", 12);
        })
        .unwrap();

        assert_eq!(graph.nodes_with_attribute("original_id", "n0").len(), 1);
        assert_eq!(graph.nodes_with_attribute("y_pos", "12").len(), 1);
        assert!(graph.nodes_with_attribute("y_pos", "13").is_empty());
    }

    #[test]
    fn test_find_node_by_name_first_wins() {
        let mut graph = unit_graph();
        graph.add_node(Node::new("D", "unit").with_name("wall"));
        graph.add_node(Node::new("E", "unit").with_name("wall"));

        assert_eq!(graph.find_node_by_name("wall").unwrap().id.as_str(), "D");
        // name defaults to the id
        assert_eq!(graph.find_node_by_name("B").unwrap().id.as_str(), "B");
        assert!(graph.find_node_by_name("floor").is_none());
    }

    #[test]
    fn test_epochs_sorted() {
        let mut graph = Graph::new("g");
        graph.add_node(Node::epoch("e2", "Roman", -27.0, 476.0));
        graph.add_node(Node::epoch("e1", "Etruscan", -900.0, -27.0));

        let names: Vec<&str> = graph.epochs().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Etruscan", "Roman"]);
    }

    #[test]
    fn test_nodes_by_family() {
        let mut graph = Graph::new("g");
        graph.add_node(Node::stratigraphic("US1", StratigraphicType::Us));
        graph.add_node(Node::property("p1", "material", "brick"));
        graph.add_node(Node::stratigraphic("SF1", StratigraphicType::SpecialFind));

        let ids: Vec<&str> = graph
            .nodes_by_family("StratigraphicNode")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["US1", "SF1"]);
    }

    #[test]
    fn test_stats_and_merge() {
        let mut a = unit_graph();
        a.add_edge("e1", "A", "B", "precedes").unwrap();

        let mut b = Graph::with_schema("b", unit_schema());
        b.add_node(Node::new("A", "unit"));
        b.add_node(Node::new("E", "unit"));
        b.add_node(Node::new("F", "document"));
        b.add_edge("e2", "A", "E", "precedes").unwrap();

        let report = a.merge_from(&b);
        assert_eq!(report.nodes_added, 2);
        assert_eq!(report.nodes_skipped, 1);
        assert_eq!(report.edges_added, 1);

        let stats = a.stats();
        assert_eq!(stats.nodes, 5);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.nodes_by_kind.get("unit"), Some(&3));
        assert_eq!(stats.edges_by_kind.get("precedes"), Some(&2));
        assert_eq!(stats.warnings, 1);
    }
}
