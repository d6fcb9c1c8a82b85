//! Tests for the fluent node and edge query builders.

use docgraph::{GraphStore, PropertyMap};

fn create_graph() -> GraphStore {
    let graph = GraphStore::default();
    graph
        .add_node(
            "d1",
            "document",
            PropertyMap::new().with("content", "The Eiffel Tower is in Paris"),
        )
        .unwrap();
    for (id, name) in [("e1", "Eiffel"), ("e2", "Tower"), ("e3", "Paris")] {
        graph
            .add_node(id, "entity", PropertyMap::new().with("name", name))
            .unwrap();
        graph
            .add_edge("d1", id, "contains", PropertyMap::new().with("position", 1i64))
            .unwrap();
    }
    graph
}

#[test]
fn test_filter_by_type() {
    let graph = create_graph();
    assert_eq!(graph.query().node_type("entity").count(), 3);
    assert_eq!(graph.query().node_type("document").count(), 1);
    assert!(!graph.query().node_type("topic").exists());
}

#[test]
fn test_results_are_oldest_first() {
    let graph = create_graph();
    let ids: Vec<String> = graph
        .query()
        .node_type("entity")
        .execute()
        .into_iter()
        .map(|node| node.id)
        .collect();
    assert_eq!(ids, vec!["e1", "e2", "e3"]);
}

#[test]
fn test_property_filters() {
    let graph = create_graph();
    let hits = graph.query().property("name", "Paris").execute();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "e3");

    assert_eq!(graph.query().property_exists("content").count(), 1);
    assert_eq!(
        graph
            .query()
            .properties(PropertyMap::new().with("name", "Tower"))
            .count(),
        1
    );
}

#[test]
fn test_name_contains() {
    let graph = create_graph();
    assert_eq!(graph.query().name_contains("TOW").count(), 1);
    assert_eq!(graph.query().name_contains("ar").count(), 1);
    assert!(!graph.query().name_contains("London").exists());
}

#[test]
fn test_exists_releases_lock() {
    let graph = create_graph();
    assert!(graph.query().property("name", "Paris").exists());
    // The read guard must be gone before the next write
    graph
        .add_node("e4", "entity", PropertyMap::new().with("name", "Seine"))
        .unwrap();
    assert!(graph.query().property("name", "Seine").exists());
}

#[test]
fn test_custom_filter_and_limit() {
    let graph = create_graph();
    let short_names = graph
        .query()
        .node_type("entity")
        .custom(|node| {
            node.properties
                .get_string("name")
                .is_some_and(|name| name.len() <= 5)
        })
        .execute();
    assert_eq!(short_names.len(), 2);

    assert_eq!(graph.query().limit(2).execute().len(), 2);
    assert!(graph.query().limit(0).execute().is_empty());
}

#[test]
fn test_edge_query() {
    let graph = create_graph();
    assert_eq!(graph.query_edges_builder().edge_type("contains").count(), 3);
    assert_eq!(graph.query_edges_builder().from_node("d1").count(), 3);

    let into_paris = graph.query_edges_builder().to_node("e3").execute();
    assert_eq!(into_paris.len(), 1);
    assert_eq!(into_paris[0].source, "d1");

    assert_eq!(
        graph
            .query_edges_builder()
            .property("position", 1i64)
            .limit(2)
            .execute()
            .len(),
        2
    );
    assert_eq!(
        graph
            .query_edges_builder()
            .custom(|edge| edge.target.ends_with('2'))
            .count(),
        1
    );
}
