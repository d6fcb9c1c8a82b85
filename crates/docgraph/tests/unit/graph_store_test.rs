//! Tests for node/edge storage and referential integrity.

use docgraph::{GraphError, GraphStore, PropertyMap};

fn store_with(ids: &[&str]) -> GraphStore {
    let store = GraphStore::default();
    for id in ids {
        store.add_node(*id, "item", PropertyMap::new()).unwrap();
    }
    store
}

#[test]
fn test_node_roundtrip() {
    let store = GraphStore::default();
    let props = PropertyMap::new()
        .with("name", "Paris")
        .with("population", 2_100_000i64)
        .with("capital", true);
    store.add_node("paris", "entity", props.clone()).unwrap();

    let node = store.get_node("paris").unwrap();
    assert_eq!(node.id, "paris");
    assert_eq!(node.node_type, "entity");
    assert_eq!(node.properties, props);
    assert!(store.get_node("london").is_none());
}

#[test]
fn test_duplicate_node_rejected() {
    let store = store_with(&["a"]);
    let err = store.add_node("a", "item", PropertyMap::new()).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateNode { ref node_id } if node_id == "a"));
    assert_eq!(store.node_count(), 1);
}

#[test]
fn test_edge_requires_both_endpoints() {
    let store = store_with(&["a"]);

    let err = store
        .add_edge("a", "missing", "rel", PropertyMap::new())
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeNotFound { ref node_id } if node_id == "missing"));

    let err = store
        .add_edge("missing", "a", "rel", PropertyMap::new())
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeNotFound { .. }));
    assert_eq!(store.edge_count(), 0);
}

#[test]
fn test_second_edge_between_pair_replaces_first() {
    let store = store_with(&["a", "b"]);
    let first = store
        .add_edge("a", "b", "rel", PropertyMap::new().with("weight", 1i64))
        .unwrap();
    let second = store
        .add_edge("a", "b", "other", PropertyMap::new().with("weight", 2i64))
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(store.edge_count(), 1);
    let edge = store.get_edge("a", "b").unwrap();
    assert_eq!(edge.id, second);
    assert_eq!(edge.edge_type, "other");
    assert_eq!(edge.properties.get_int("weight"), Some(2));
    assert_eq!(store.get_neighbors("a", None).len(), 1);
}

#[test]
fn test_edges_are_directed() {
    let store = store_with(&["a", "b"]);
    store.add_edge("a", "b", "rel", PropertyMap::new()).unwrap();

    assert!(store.get_edge("a", "b").is_some());
    assert!(store.get_edge("b", "a").is_none());
    assert!(store.get_neighbors("b", None).is_empty());
    assert_eq!(store.get_predecessors("b", None).len(), 1);
}

#[test]
fn test_neighbors_filtered_by_type() {
    let store = store_with(&["doc", "e1", "e2"]);
    store.add_edge("doc", "e1", "contains", PropertyMap::new()).unwrap();
    store.add_edge("doc", "e2", "mentions", PropertyMap::new()).unwrap();

    let contains = store.get_neighbors("doc", Some("contains"));
    assert_eq!(contains.len(), 1);
    assert_eq!(contains[0].0.id, "e1");
    assert_eq!(contains[0].1.edge_type, "contains");

    assert_eq!(store.get_neighbors("doc", None).len(), 2);
    assert!(store.get_neighbors("doc", Some("unknown")).is_empty());
    assert!(store.get_neighbors("missing", None).is_empty());
}

#[test]
fn test_remove_node_cascades_to_edges() {
    let store = store_with(&["a", "b", "c"]);
    store.add_edge("a", "b", "rel", PropertyMap::new()).unwrap();
    store.add_edge("b", "c", "rel", PropertyMap::new()).unwrap();
    store.add_edge("c", "a", "rel", PropertyMap::new()).unwrap();

    assert!(store.remove_node("b"));
    assert!(!store.remove_node("b"));

    assert_eq!(store.edge_count(), 1);
    for edge in store.edges() {
        assert!(store.contains_node(&edge.source));
        assert!(store.contains_node(&edge.target));
    }
    assert!(store.get_neighbors("a", None).is_empty());
    assert!(store.get_predecessors("c", None).is_empty());
}

#[test]
fn test_remove_edge() {
    let store = store_with(&["a", "b"]);
    store.add_edge("a", "b", "rel", PropertyMap::new()).unwrap();

    assert!(store.remove_edge("a", "b"));
    assert!(!store.remove_edge("a", "b"));
    assert_eq!(store.node_count(), 2);
    assert_eq!(store.edge_count(), 0);
}

#[test]
fn test_query_nodes_by_type_and_properties() {
    let store = GraphStore::default();
    store
        .add_node("d1", "document", PropertyMap::new().with("lang", "en"))
        .unwrap();
    store
        .add_node("d2", "document", PropertyMap::new().with("lang", "fr"))
        .unwrap();
    store
        .add_node("e1", "entity", PropertyMap::new().with("lang", "en"))
        .unwrap();

    assert_eq!(store.query_nodes(Some("document"), None).len(), 2);
    assert_eq!(store.query_nodes(None, None).len(), 3);

    let english = PropertyMap::new().with("lang", "en");
    let hits = store.query_nodes(Some("document"), Some(&english));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "d1");
    assert_eq!(store.query_nodes(None, Some(&english)).len(), 2);
    assert!(store.query_nodes(Some("nothing"), None).is_empty());
}

#[test]
fn test_query_edges() {
    let store = store_with(&["a", "b", "c"]);
    store
        .add_edge("a", "b", "contains", PropertyMap::new().with("weight", 1i64))
        .unwrap();
    store.add_edge("a", "c", "mentions", PropertyMap::new()).unwrap();

    assert_eq!(store.query_edges(Some("contains"), None).len(), 1);
    assert_eq!(store.query_edges(None, None).len(), 2);
    let weighted = PropertyMap::new().with("weight", 1i64);
    assert_eq!(store.query_edges(None, Some(&weighted))[0].target, "b");
}

#[test]
fn test_update_node_properties_merges() {
    let store = GraphStore::default();
    store
        .add_node("n", "item", PropertyMap::new().with("a", 1i64).with("b", 2i64))
        .unwrap();

    assert!(store
        .update_node_properties("n", PropertyMap::new().with("b", 3i64))
        .unwrap());
    assert!(!store.update_node_properties("missing", PropertyMap::new()).unwrap());

    let node = store.get_node("n").unwrap();
    assert_eq!(node.properties.get_int("a"), Some(1));
    assert_eq!(node.properties.get_int("b"), Some(3));
}

#[test]
fn test_non_finite_properties_rejected() {
    let store = store_with(&["a", "b"]);

    let err = store
        .add_node("c", "item", PropertyMap::new().with("score", f64::NAN))
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidOperation { .. }));
    assert!(!store.contains_node("c"));

    let err = store
        .add_edge("a", "b", "link", PropertyMap::new().with("weight", f64::INFINITY))
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidOperation { .. }));
    assert_eq!(store.edge_count(), 0);

    let err = store
        .update_node_properties("a", PropertyMap::new().with("score", f64::NEG_INFINITY))
        .unwrap_err();
    assert!(!err.is_retryable());
    assert!(store.get_node("a").unwrap().properties.is_empty());
}

#[test]
fn test_stats_counts_distinct_types() {
    let store = GraphStore::default();
    store.add_node("d1", "document", PropertyMap::new()).unwrap();
    store.add_node("d2", "document", PropertyMap::new()).unwrap();
    store.add_node("e1", "entity", PropertyMap::new()).unwrap();
    store.add_edge("d1", "e1", "contains", PropertyMap::new()).unwrap();
    store.add_edge("d2", "e1", "contains", PropertyMap::new()).unwrap();

    let stats = store.stats();
    assert_eq!(stats.node_count, 3);
    assert_eq!(stats.edge_count, 2);
    assert_eq!(stats.node_type_count, 2);
    assert_eq!(stats.edge_type_count, 1);
}

#[test]
fn test_clear_keeps_edge_ids_unique() {
    let store = store_with(&["a", "b"]);
    let before = store.add_edge("a", "b", "rel", PropertyMap::new()).unwrap();

    store.clear();
    assert_eq!(store.node_count(), 0);
    assert_eq!(store.edge_count(), 0);

    store.add_node("a", "item", PropertyMap::new()).unwrap();
    store.add_node("b", "item", PropertyMap::new()).unwrap();
    let after = store.add_edge("a", "b", "rel", PropertyMap::new()).unwrap();
    assert!(after > before);
}

#[test]
fn test_generated_ids_are_unique() {
    let a = GraphStore::new_node_id();
    let b = GraphStore::new_node_id();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn test_concurrent_readers_and_writer() {
    use std::sync::Arc;
    use std::thread;

    let store = Arc::new(GraphStore::default());
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..200 {
                store
                    .add_node(format!("n{i}"), "item", PropertyMap::new())
                    .unwrap();
                if i > 0 {
                    store
                        .add_edge(&format!("n{}", i - 1), &format!("n{i}"), "next", PropertyMap::new())
                        .unwrap();
                }
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    for edge in store.edges() {
                        assert!(edge.source.starts_with('n'));
                    }
                    let _ = store.stats();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.node_count(), 200);
    assert_eq!(store.edge_count(), 199);
}
