//! Graph traversal types and algorithms

use crate::edge::{Direction, Edge, EdgeId};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Maximum traversal depth (50)
pub const MAX_TRAVERSAL_DEPTH: u32 = 50;

/// Traversal query builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalQuery {
    /// Starting node id
    pub start: String,

    /// Target node id (for path finding, None for general traversal)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Maximum traversal depth, capped at [`MAX_TRAVERSAL_DEPTH`]
    #[serde(default = "default_depth")]
    pub max_depth: u32,

    #[serde(default = "default_direction")]
    pub direction: Direction,

    /// Node kinds or kind families to enter (empty = all)
    #[serde(default)]
    pub node_kind_filter: Vec<String>,

    /// Edge kinds to follow (empty = all)
    #[serde(default)]
    pub edge_kind_filter: Vec<String>,
}

fn default_depth() -> u32 {
    10
}

fn default_direction() -> Direction {
    Direction::Both
}

impl Default for TraversalQuery {
    fn default() -> Self {
        Self {
            start: String::new(),
            target: None,
            max_depth: default_depth(),
            direction: default_direction(),
            node_kind_filter: Vec::new(),
            edge_kind_filter: Vec::new(),
        }
    }
}

impl TraversalQuery {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            ..Default::default()
        }
    }

    /// Set target for path finding
    pub fn find_path_to(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn filter_node_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_kind_filter = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter_edge_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_kind_filter = kinds.into_iter().map(Into::into).collect();
        self
    }
}

/// A single path through the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    /// Node ids from start to target
    pub nodes: Vec<NodeId>,

    /// Edges connecting consecutive nodes
    pub edges: Vec<PathEdge>,

    /// Number of edges
    pub length: usize,
}

/// Edge in a path, oriented as stored in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: String,
}

impl From<&Edge> for PathEdge {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            from: edge.source.clone(),
            to: edge.target.clone(),
            kind: edge.kind.to_string(),
        }
    }
}

/// Result of a traversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalResult {
    pub start: NodeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Shortest path to the target, when one was requested and found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<GraphPath>,

    /// Reached nodes in breadth-first order, starting with `start`
    pub visited: Vec<NodeId>,

    /// Edges through which a node was first reached
    pub edges: Vec<EdgeId>,

    pub stats: TraversalStats,
}

/// Traversal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub edges_traversed: usize,
    pub max_depth_reached: u32,
    pub path_found: bool,
}

/// Graph traversal engine
pub struct TraversalEngine;

impl TraversalEngine {
    /// Breadth-first traversal over the graph index.
    ///
    /// Each node is entered at most once, so the traversal terminates on
    /// cyclic graphs. With a target set, the search stops when the target is
    /// dequeued and the shortest path is returned.
    pub fn execute(query: &TraversalQuery, graph: &Graph) -> Result<TraversalResult> {
        let start = graph
            .find_node_by_id(&query.start)
            .ok_or_else(|| Error::NodeNotFound(query.start.clone()))?;
        let max_depth = query.max_depth.min(MAX_TRAVERSAL_DEPTH);

        tracing::debug!(
            "Executing traversal: start={}, target={:?}, depth={}, direction={:?}",
            query.start,
            query.target,
            max_depth,
            query.direction
        );

        let mut order: Vec<&NodeId> = vec![&start.id];
        let mut parent: HashMap<&str, Option<&Edge>> = HashMap::new();
        let mut reached_by: Vec<&Edge> = Vec::new();
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        let mut stats = TraversalStats::default();

        parent.insert(start.id.as_str(), None);
        queue.push_back((start.id.as_str(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            stats.nodes_visited += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(depth);

            if query.target.as_deref() == Some(current) {
                stats.path_found = true;
                tracing::debug!("BFS found path at depth {}", depth);
                break;
            }

            if depth >= max_depth {
                continue;
            }

            for edge in graph.edges_of(current, query.direction) {
                stats.edges_traversed += 1;

                if !query.edge_kind_filter.is_empty() && !query.edge_kind_filter.contains(&edge.kind.0) {
                    continue;
                }

                let Some(next) = edge.opposite(current) else {
                    continue;
                };
                if parent.contains_key(next.as_str()) {
                    continue;
                }

                if !query.node_kind_filter.is_empty() {
                    let admitted = graph.find_node_by_id(next.as_str()).is_some_and(|node| {
                        query
                            .node_kind_filter
                            .iter()
                            .any(|family| graph.schema().is_kind_of(node.kind.as_str(), family))
                    });
                    if !admitted {
                        continue;
                    }
                }

                parent.insert(next.as_str(), Some(edge));
                order.push(next);
                reached_by.push(edge);
                queue.push_back((next.as_str(), depth + 1));
            }
        }

        let path = match (&query.target, stats.path_found) {
            (Some(target), true) => Some(Self::reconstruct_path(target, &parent)),
            _ => None,
        };

        tracing::debug!(
            "Traversal visited {} nodes, traversed {} edges",
            stats.nodes_visited,
            stats.edges_traversed
        );

        Ok(TraversalResult {
            start: start.id.clone(),
            target: query.target.clone(),
            path,
            visited: order.into_iter().cloned().collect(),
            edges: reached_by.into_iter().map(|e| e.id.clone()).collect(),
            stats,
        })
    }

    /// Walk parent edges back from `end` to the start
    fn reconstruct_path(end: &str, parent: &HashMap<&str, Option<&Edge>>) -> GraphPath {
        let mut nodes = vec![NodeId::new(end)];
        let mut edges = Vec::new();
        let mut current = end;

        while let Some(Some(edge)) = parent.get(current) {
            let Some(prev) = edge.opposite(current) else {
                break;
            };
            edges.push(PathEdge::from(*edge));
            nodes.push(prev.clone());
            current = prev.as_str();
        }

        nodes.reverse();
        edges.reverse();

        GraphPath {
            length: edges.len(),
            nodes,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::schema::Schema;
    use std::sync::Arc;

    fn create_test_graph() -> Graph {
        let schema = Schema::builder()
            .node_kind("unit", None)
            .node_kind("cut", Some("unit"))
            .node_kind("note", None)
            .edge("connects", &["Node"], &["Node"])
            .edge("annotates", &["note"], &["unit"])
            .build()
            .unwrap();
        let mut graph = Graph::with_schema("t", Arc::new(schema));

        for name in ["A", "B", "C", "D", "E"] {
            graph.add_node(Node::new(name, "unit"));
        }
        graph.add_node(Node::new("F", "cut"));
        graph.add_node(Node::new("N", "note"));

        // A --> B --> C --> D
        //       |     |
        //       v     v
        //       E --> F
        for (id, from, to) in [
            ("ab", "A", "B"),
            ("bc", "B", "C"),
            ("cd", "C", "D"),
            ("be", "B", "E"),
            ("cf", "C", "F"),
            ("ef", "E", "F"),
        ] {
            graph.add_edge(id, from, to, "connects").unwrap();
        }
        graph.add_edge("na", "N", "A", "annotates").unwrap();
        graph
    }

    fn visited(result: &TraversalResult) -> Vec<&str> {
        result.visited.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn test_bfs_shortest_path() {
        let graph = create_test_graph();
        let query = TraversalQuery::new("A").find_path_to("D");
        let result = graph.traverse(&query).unwrap();

        assert!(result.stats.path_found);
        let path = result.path.unwrap();
        let nodes: Vec<&str> = path.nodes.iter().map(NodeId::as_str).collect();
        assert_eq!(nodes, vec!["A", "B", "C", "D"]);
        assert_eq!(path.length, 3);
        assert_eq!(path.edges[0].id.as_str(), "ab");
    }

    #[test]
    fn test_breadth_first_order() {
        let graph = create_test_graph();
        let query = TraversalQuery::new("A")
            .with_direction(Direction::Outgoing)
            .with_depth(2);
        let result = graph.traverse(&query).unwrap();

        assert_eq!(visited(&result), vec!["A", "B", "C", "E"]);
        assert_eq!(result.stats.max_depth_reached, 2);
    }

    #[test]
    fn test_no_path_found() {
        let graph = create_test_graph();
        let query = TraversalQuery::new("D")
            .with_direction(Direction::Outgoing)
            .find_path_to("A");
        let result = graph.traverse(&query).unwrap();

        assert!(!result.stats.path_found);
        assert!(result.path.is_none());
    }

    #[test]
    fn test_direction_filtering() {
        let graph = create_test_graph();

        let incoming = TraversalQuery::new("B")
            .with_direction(Direction::Incoming)
            .with_depth(1);
        let result = graph.traverse(&incoming).unwrap();
        assert_eq!(visited(&result), vec!["B", "A"]);

        let both = TraversalQuery::new("B").with_depth(1);
        let result = graph.traverse(&both).unwrap();
        assert_eq!(visited(&result), vec!["B", "A", "C", "E"]);
    }

    #[test]
    fn test_edge_kind_filter() {
        let graph = create_test_graph();
        let query = TraversalQuery::new("A").filter_edge_kinds(["annotates"]);
        let result = graph.traverse(&query).unwrap();

        assert_eq!(visited(&result), vec!["A", "N"]);
    }

    #[test]
    fn test_node_kind_filter_uses_families() {
        let graph = create_test_graph();
        let query = TraversalQuery::new("A")
            .with_direction(Direction::Outgoing)
            .filter_node_kinds(["unit"]);
        let result = graph.traverse(&query).unwrap();

        // "cut" descends from "unit"
        assert!(visited(&result).contains(&"F"));

        let query = TraversalQuery::new("C")
            .with_direction(Direction::Outgoing)
            .filter_node_kinds(["cut"]);
        let result = graph.traverse(&query).unwrap();
        assert_eq!(visited(&result), vec!["C", "F"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut graph = create_test_graph();
        graph.add_edge("da", "D", "A", "connects").unwrap();

        let query = TraversalQuery::new("A")
            .with_direction(Direction::Outgoing)
            .with_depth(MAX_TRAVERSAL_DEPTH + 10);
        let result = graph.traverse(&query).unwrap();
        assert_eq!(result.visited.len(), 6);
    }

    #[test]
    fn test_query_direction_defaults_to_both() {
        let query: TraversalQuery = serde_json::from_str(r#"{"start": "A"}"#).unwrap();
        assert_eq!(query.direction, Direction::Both);
        assert_eq!(query.max_depth, TraversalQuery::new("A").max_depth);

        let query: TraversalQuery =
            serde_json::from_str(r#"{"start": "A", "direction": "incoming"}"#).unwrap();
        assert_eq!(query.direction, Direction::Incoming);
    }

    #[test]
    fn test_missing_start() {
        let graph = create_test_graph();
        let err = graph.traverse(&TraversalQuery::new("nope")).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }
}
