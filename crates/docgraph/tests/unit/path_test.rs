//! Tests for bounded path finding.
//!
//! Tests cover:
//! - Shortest path over a chain
//! - Depth bound
//! - Direction of edges
//! - source == target
//! - Missing endpoints

use docgraph::{GraphStore, PathStep, PropertyMap};

// A -> B -> C -> D, plus a shortcut A -> C
fn create_graph() -> GraphStore {
    let graph = GraphStore::default();
    for id in ["a", "b", "c", "d"] {
        graph.add_node(id, "item", PropertyMap::new()).unwrap();
    }
    graph.add_edge("a", "b", "next", PropertyMap::new()).unwrap();
    graph.add_edge("b", "c", "next", PropertyMap::new()).unwrap();
    graph.add_edge("c", "d", "next", PropertyMap::new()).unwrap();
    graph.add_edge("a", "c", "shortcut", PropertyMap::new()).unwrap();
    graph
}

fn node_ids(path: &[PathStep]) -> Vec<&str> {
    path.iter().map(|step| step.node.id.as_str()).collect()
}

#[test]
fn test_shortest_path_is_found() {
    let graph = create_graph();
    let path = graph.find_path("a", "d", 5).unwrap();

    assert_eq!(node_ids(&path), vec!["a", "c", "d"]);
    assert_eq!(path[0].edge.as_ref().unwrap().edge_type, "shortcut");
    assert_eq!(path[1].edge.as_ref().unwrap().edge_type, "next");
    assert!(path[2].edge.is_none());
}

#[test]
fn test_path_edges_connect_consecutive_nodes() {
    let graph = create_graph();
    let path = graph.find_path("b", "d", 3).unwrap();

    for pair in path.windows(2) {
        let edge = pair[0].edge.as_ref().unwrap();
        assert_eq!(edge.source, pair[0].node.id);
        assert_eq!(edge.target, pair[1].node.id);
    }
}

#[test]
fn test_depth_bound() {
    let graph = create_graph();
    assert!(graph.find_path("a", "d", 1).is_none());
    assert_eq!(graph.find_path("a", "d", 2).unwrap().len(), 3);
    assert!(graph.find_path("b", "d", 1).is_none());
}

#[test]
fn test_edges_are_followed_forward_only() {
    let graph = create_graph();
    assert!(graph.find_path("d", "a", 10).is_none());
}

#[test]
fn test_source_equals_target() {
    let graph = create_graph();
    let path = graph.find_path("b", "b", 0).unwrap();
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].node.id, "b");
    assert!(path[0].edge.is_none());
}

#[test]
fn test_missing_endpoints() {
    let graph = create_graph();
    assert!(graph.find_path("a", "missing", 5).is_none());
    assert!(graph.find_path("missing", "a", 5).is_none());
    assert!(graph.find_path("missing", "missing", 5).is_none());
}

#[test]
fn test_cycles_terminate() {
    let graph = GraphStore::default();
    for id in ["x", "y", "z", "island"] {
        graph.add_node(id, "item", PropertyMap::new()).unwrap();
    }
    graph.add_edge("x", "y", "next", PropertyMap::new()).unwrap();
    graph.add_edge("y", "z", "next", PropertyMap::new()).unwrap();
    graph.add_edge("z", "x", "next", PropertyMap::new()).unwrap();

    assert!(graph.find_path("x", "island", 100).is_none());
    assert_eq!(node_ids(&graph.find_path("y", "x", 100).unwrap()), vec!["y", "z", "x"]);
}

#[test]
fn test_path_after_node_removal() {
    let graph = create_graph();
    graph.remove_node("c");
    assert!(graph.find_path("a", "d", 10).is_none());
    assert_eq!(node_ids(&graph.find_path("a", "b", 10).unwrap()), vec!["a", "b"]);
}
