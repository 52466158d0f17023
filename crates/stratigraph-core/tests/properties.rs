//! Property tests for graph integrity and index consistency

use proptest::prelude::*;
use std::sync::Arc;
use stratigraph_core::{Edge, Error, Graph, Node, Schema};

const NODE_KINDS: [&str; 3] = ["unit", "document", "mystery"];
const EDGE_KINDS: [&str; 3] = ["precedes", "cites", "bogus"];

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .node_kind("unit", None)
            .node_kind("document", None)
            .edge_with_reverse("precedes", "follows", &["unit"], &["unit"])
            .edge("cites", &["unit"], &["document"])
            .build()
            .unwrap(),
    )
}

#[derive(Debug, Clone)]
enum Op {
    AddNode { id: u8, kind: usize },
    ReplaceNode { id: u8, kind: usize },
    AddEdge { id: u8, source: u8, target: u8, kind: usize },
    RemoveNode { id: u8 },
    RemoveEdge { id: u8 },
    Query { kind: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..12, 0usize..3).prop_map(|(id, kind)| Op::AddNode { id, kind }),
        1 => (0u8..12, 0usize..3).prop_map(|(id, kind)| Op::ReplaceNode { id, kind }),
        4 => (0u8..20, 0u8..14, 0u8..14, 0usize..3)
            .prop_map(|(id, source, target, kind)| Op::AddEdge { id, source, target, kind }),
        1 => (0u8..12).prop_map(|id| Op::RemoveNode { id }),
        1 => (0u8..20).prop_map(|id| Op::RemoveEdge { id }),
        2 => (0usize..3).prop_map(|kind| Op::Query { kind }),
    ]
}

fn node(id: u8, kind: usize) -> Node {
    Node::new(format!("n{id}"), NODE_KINDS[kind])
}

fn apply(graph: &mut Graph, op: &Op) {
    match *op {
        Op::AddNode { id, kind } => {
            graph.add_node(node(id, kind));
        }
        Op::ReplaceNode { id, kind } => {
            graph.replace_node(node(id, kind));
        }
        Op::AddEdge { id, source, target, kind } => {
            let _ = graph.add_edge(
                format!("e{id}"),
                format!("n{source}"),
                format!("n{target}"),
                EDGE_KINDS[kind],
            );
        }
        Op::RemoveNode { id } => {
            let _ = graph.remove_node(&format!("n{id}"));
        }
        Op::RemoveEdge { id } => {
            let _ = graph.remove_edge(&format!("e{id}"));
        }
        Op::Query { kind } => {
            graph.nodes_by_type(NODE_KINDS[kind]);
        }
    }
}

fn ids<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Vec<String> {
    nodes.into_iter().map(|n| n.id.to_string()).collect()
}

fn edge_ids<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Vec<String> {
    edges.into_iter().map(|e| e.id.to_string()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: no sequence of mutations leaves an edge pointing at a missing node
    #[test]
    fn prop_no_dangling_edges(ops in prop::collection::vec(op(), 0..60)) {
        let mut graph = Graph::with_schema("g", schema());
        for op in &ops {
            apply(&mut graph, op);
        }

        for edge in graph.edges() {
            prop_assert!(graph.find_node_by_id(edge.source.as_str()).is_some());
            prop_assert!(graph.find_node_by_id(edge.target.as_str()).is_some());
        }
    }

    /// Property: index-served queries always match a scan of the primary collections
    #[test]
    fn prop_index_matches_scan(ops in prop::collection::vec(op(), 0..60)) {
        let mut graph = Graph::with_schema("g", schema());
        for op in &ops {
            apply(&mut graph, op);

            for kind in NODE_KINDS {
                prop_assert_eq!(
                    ids(graph.nodes_by_type(kind)),
                    ids(graph.nodes().filter(|n| n.kind.as_str() == kind))
                );
            }
        }

        for kind in EDGE_KINDS {
            prop_assert_eq!(
                edge_ids(graph.edges_by_type(kind)),
                edge_ids(graph.edges().filter(|e| e.kind.as_str() == kind))
            );
        }
        for id in 0u8..14 {
            let node = format!("n{id}");
            prop_assert_eq!(
                edge_ids(graph.edges_from(&node)),
                edge_ids(graph.edges().filter(|e| e.source.as_str() == node))
            );
            prop_assert_eq!(
                edge_ids(graph.edges_to(&node)),
                edge_ids(graph.edges().filter(|e| e.target.as_str() == node))
            );
        }
    }

    /// Property: inadmissible triples are rejected and leave no trace
    #[test]
    fn prop_inadmissible_edges_absent(
        source_kind in 0usize..3,
        target_kind in 0usize..3,
        edge_kind in 0usize..3,
    ) {
        let mut graph = Graph::with_schema("g", schema());
        graph.add_node(node(0, source_kind));
        graph.add_node(node(1, target_kind));

        let admissible = graph.validate_connection(
            NODE_KINDS[source_kind],
            NODE_KINDS[target_kind],
            EDGE_KINDS[edge_kind],
        );
        let result = graph.add_edge("e", "n0", "n1", EDGE_KINDS[edge_kind]).map(|_| ());

        if admissible {
            prop_assert!(result.is_ok());
            prop_assert_eq!(graph.edges_from("n0").len(), 1);
        } else {
            let is_violation = matches!(result, Err(Error::SchemaViolation { .. }));
            prop_assert!(is_violation);
            prop_assert!(graph.find_edge_by_id("e").is_none());
            prop_assert!(graph.edges_from("n0").is_empty());
        }
    }

    /// Property: a node batch is indistinguishable from sequential inserts
    #[test]
    fn prop_batch_equivalence(nodes in prop::collection::vec((0u8..10, 0usize..3), 0..30)) {
        let mut batched = Graph::with_schema("g", schema());
        let mut sequential = Graph::with_schema("g", schema());

        batched.add_nodes_batch(nodes.iter().map(|&(id, kind)| node(id, kind)));
        for &(id, kind) in &nodes {
            sequential.add_node(node(id, kind));
        }

        prop_assert_eq!(ids(batched.nodes()), ids(sequential.nodes()));
        prop_assert_eq!(batched.warnings(), sequential.warnings());
        for kind in NODE_KINDS {
            prop_assert_eq!(
                ids(batched.nodes_by_type(kind)),
                ids(sequential.nodes_by_type(kind))
            );
        }
        prop_assert!(batched.index_rebuilds() <= 1);
    }

    /// Property: adding the same node twice only adds a warning
    #[test]
    fn prop_add_node_idempotent(id in 0u8..10, kind in 0usize..3, name in "[a-z]{1,8}") {
        let mut graph = Graph::with_schema("g", schema());
        graph.add_node(node(id, kind).with_name(name.clone()));
        let once: Vec<Node> = graph.nodes().cloned().collect();
        let warnings = graph.warnings().len();

        graph.add_node(node(id, kind).with_name(format!("{name}-again")));

        prop_assert_eq!(graph.nodes().cloned().collect::<Vec<_>>(), once);
        prop_assert_eq!(graph.warnings().len(), warnings + 1);
    }
}

#[test]
fn scenario_admissible_unit_edge() {
    let mut graph = Graph::with_schema("g", schema());
    graph.add_node(Node::new("A", "unit"));
    graph.add_node(Node::new("B", "unit"));

    assert!(graph.add_edge("e1", "A", "B", "precedes").is_ok());
    assert_eq!(graph.edges_from("A").len(), 1);
}

#[test]
fn scenario_inadmissible_unit_document_edge() {
    let mut graph = Graph::with_schema("g", schema());
    graph.add_node(Node::new("A", "unit"));
    graph.add_node(Node::new("C", "document"));
    let before = (graph.node_count(), graph.edge_count());

    assert!(graph.add_edge("e1", "A", "C", "precedes").is_err());
    assert_eq!((graph.node_count(), graph.edge_count()), before);
    assert!(graph.edges_from("A").is_empty());
}

#[test]
fn scenario_paradata_chain_without_documentation() {
    let mut graph = Graph::new("g");
    graph.add_node(Node::new("US1", "US"));

    let chain = graph.paradata_chain("US1").unwrap();
    assert!(chain.properties.is_empty());
    assert!(chain.combiners.is_empty());
    assert!(chain.extractors.is_empty());
    assert!(chain.documents.is_empty());
}
