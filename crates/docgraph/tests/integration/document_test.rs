//! Document layer integration tests
//!
//! Stores documents through the public API and checks retrieval, updates,
//! listing and the graph left behind.

use docgraph::{
    DocumentStorage, GraphConfig, GraphError, KnowledgeGraph, PropertyMap, RetrieveOptions,
    SearchType,
};

fn knowledge_graph() -> KnowledgeGraph {
    KnowledgeGraph::in_memory(GraphConfig::default())
}

#[test]
fn test_eiffel_paris_scenario() {
    let kg = knowledge_graph();
    let doc1 = kg
        .store("The Eiffel Tower is in Paris", PropertyMap::new())
        .unwrap();
    let doc2 = kg.store("Paris hosts many Museums", PropertyMap::new()).unwrap();

    // Keyword: doc2 shares two of four words with the query
    let options = RetrieveOptions::keyword().with_min_score(0.1);
    let hits = kg.retrieve("Paris museums", &options).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document.id, doc2.id);
    assert!((hits[0].score - 0.5).abs() < 1e-9);
    assert_eq!(hits[1].document.id, doc1.id);
    assert!((hits[1].score - 1.0 / 7.0).abs() < 1e-9);

    // Entity: each document has its own "Paris" entity node
    let hits = kg.retrieve("Paris", &RetrieveOptions::entity()).unwrap();
    let ids: Vec<&str> = hits.iter().map(|hit| hit.document.id.as_str()).collect();
    assert_eq!(ids, vec![doc1.id.as_str(), doc2.id.as_str()]);
    for hit in &hits {
        assert_eq!(hit.metadata.get_string("entity"), Some("Paris"));
    }

    let hits = kg.retrieve("museums", &RetrieveOptions::entity()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.id, doc2.id);
}

#[test]
fn test_results_sorted_and_bounded() {
    let kg = knowledge_graph();
    for content in [
        "rust graph store",
        "rust graph",
        "rust",
        "python scripts",
        "graph theory in rust",
    ] {
        kg.store(content, PropertyMap::new()).unwrap();
    }

    let options = RetrieveOptions::keyword().with_min_score(0.2).with_limit(3);
    let hits = kg.retrieve("rust graph", &options).unwrap();

    assert!(hits.len() <= 3);
    assert!(hits.iter().all(|hit| hit.score >= 0.2 && hit.score <= 1.0));
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(hits[0].document.content, "rust graph");
}

#[test]
fn test_retrieval_is_idempotent() {
    let kg = knowledge_graph();
    kg.store("The Eiffel Tower is in Paris", PropertyMap::new())
        .unwrap();
    kg.store("Paris hosts many museums", PropertyMap::new()).unwrap();
    let stats = kg.stats();

    for options in [
        RetrieveOptions::keyword().with_min_score(0.1),
        RetrieveOptions::entity().with_min_score(0.1),
    ] {
        let first = kg.retrieve("Paris museums", &options).unwrap();
        let second = kg.retrieve("Paris museums", &options).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(kg.stats(), stats);
}

#[test]
fn test_empty_query_matches_nothing() {
    let kg = knowledge_graph();
    kg.store("Some content here", PropertyMap::new()).unwrap();

    let hits = kg
        .retrieve("", &RetrieveOptions::keyword().with_min_score(0.0))
        .unwrap();
    assert!(hits.iter().all(|hit| hit.score == 0.0));
}

#[test]
fn test_unknown_search_type_rejected() {
    let options = RetrieveOptions::from_map(&PropertyMap::new().with("search_type", "semantic"));
    assert!(matches!(options, Err(GraphError::InvalidQuery { .. })));
    assert!("semantic".parse::<SearchType>().is_err());
}

#[test]
fn test_update_then_retrieve_uses_new_content() {
    let kg = knowledge_graph();
    let doc = kg.store("Visit Paris today", PropertyMap::new()).unwrap();

    kg.update(&doc.id, Some("Visit London today"), None)
        .unwrap()
        .unwrap();

    let options = RetrieveOptions::keyword().with_min_score(0.1);
    let hits = kg.retrieve("london", &options).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.content, "Visit London today");

    // Entity search still finds the orphaned "Paris" entity, but no document
    let hits = kg.retrieve("Paris", &RetrieveOptions::entity()).unwrap();
    assert!(hits.is_empty());
    let hits = kg.retrieve("London", &RetrieveOptions::entity()).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_update_without_changes_keeps_timestamp() {
    let kg = knowledge_graph();
    let doc = kg.store("Visit Paris", PropertyMap::new()).unwrap();

    let same = kg.update(&doc.id, None, None).unwrap().unwrap();
    assert_eq!(same, doc);
}

#[test]
fn test_list_documents_pagination() {
    let kg = knowledge_graph();
    let ids: Vec<String> = (0..7)
        .map(|i| {
            kg.store(&format!("document number {i}"), PropertyMap::new())
                .unwrap()
                .id
        })
        .collect();

    let first = kg.list_documents(3, 0).unwrap();
    let second = kg.list_documents(3, 3).unwrap();
    let third = kg.list_documents(3, 6).unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(third.len(), 1);

    let listed: Vec<String> = first
        .into_iter()
        .chain(second)
        .chain(third)
        .map(|doc| doc.id)
        .collect();
    let expected: Vec<String> = ids.into_iter().rev().collect();
    assert_eq!(listed, expected);

    assert!(kg.list_documents(0, 0).unwrap().is_empty());
}

#[test]
fn test_entities_not_listed_as_documents() {
    let kg = knowledge_graph();
    kg.store("Alice met Bobby in Berlin", PropertyMap::new())
        .unwrap();

    assert_eq!(kg.list_documents(100, 0).unwrap().len(), 1);
    assert_eq!(kg.graph().query().node_type("entity").count(), 3);
}

#[test]
fn test_repeated_store_creates_separate_entities_by_default() {
    let kg = knowledge_graph();
    kg.store("Visit Paris", PropertyMap::new()).unwrap();
    kg.store("Visit Paris", PropertyMap::new()).unwrap();

    let paris = kg
        .graph()
        .query()
        .node_type("entity")
        .property("name", "Paris")
        .count();
    assert_eq!(paris, 2);
}

#[test]
fn test_deduplicated_entities_shared_across_documents() {
    let kg =
        KnowledgeGraph::in_memory(GraphConfig::default().with_entity_deduplication(true));
    let a = kg.store("Visit Paris", PropertyMap::new()).unwrap();
    let b = kg.store("Paris again", PropertyMap::new()).unwrap();

    let hits = kg.retrieve("Paris", &RetrieveOptions::entity()).unwrap();
    let mut ids: Vec<String> = hits.into_iter().map(|hit| hit.document.id).collect();
    ids.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn test_relationships_reachable_through_graph() {
    let kg = knowledge_graph();
    let a = kg.store("Visit Paris", PropertyMap::new()).unwrap();
    let paris = kg
        .graph()
        .query()
        .node_type("entity")
        .property("name", "Paris")
        .execute()
        .remove(0);

    let path = kg.graph().find_path(&a.id, &paris.id, 1).unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].edge.as_ref().unwrap().edge_type, "contains");
}

#[test]
fn test_concurrent_stores() {
    use std::sync::Arc;
    use std::thread;

    let kg = Arc::new(knowledge_graph());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let kg = Arc::clone(&kg);
            thread::spawn(move || {
                for i in 0..10 {
                    kg.store(&format!("Thread{t} document {i}"), PropertyMap::new())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(kg.list_documents(100, 0).unwrap().len(), 40);
    // Each document mentions exactly one entity
    assert_eq!(kg.graph().edge_count(), 40);
}

#[test]
fn test_trait_object_usage() {
    let storage: Box<dyn DocumentStorage> = Box::new(knowledge_graph());
    let doc = storage
        .store("Visit Paris", PropertyMap::new().with("lang", "en"))
        .unwrap();

    let updated = storage
        .update(&doc.id, None, Some(PropertyMap::new().with("lang", "fr")))
        .unwrap()
        .unwrap();
    assert_eq!(updated.metadata.get_string("lang"), Some("fr"));

    let hits = storage
        .retrieve("visit paris", &RetrieveOptions::default())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(storage.delete(&doc.id).unwrap());
    storage.close().unwrap();
}
