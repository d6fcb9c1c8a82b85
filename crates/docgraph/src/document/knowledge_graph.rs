//! Graph-backed document store.

use super::text::{extract_entities, jaccard, word_set};
use super::{
    Document, DocumentStorage, QueryResult, RetrieveOptions, SearchType, CONTAINS_EDGE,
    DOCUMENT_TYPE, ENTITY_TYPE,
};
use crate::config::GraphConfig;
use crate::error::Result;
use crate::graph::{GraphStats, GraphStore, NodeId, PropertyMap};
use crate::persistence::PersistenceManager;
use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Document store that keeps documents and their entities in a [`GraphStore`]
/// and snapshots the whole graph after every mutation.
///
/// # Example
///
/// ```rust
/// use docgraph::{GraphConfig, KnowledgeGraph, PropertyMap, RetrieveOptions};
///
/// let kg = KnowledgeGraph::in_memory(GraphConfig::default());
/// kg.store("The Eiffel Tower is in Paris", PropertyMap::new()).unwrap();
///
/// let hits = kg
///     .retrieve("Paris", &RetrieveOptions::entity().with_min_score(0.1))
///     .unwrap();
/// assert_eq!(hits.len(), 1);
/// ```
#[derive(Debug)]
pub struct KnowledgeGraph {
    graph: GraphStore,
    persistence: PersistenceManager,
    config: GraphConfig,
    // Serializes store/update/delete so multi-step edits never interleave
    writer: Mutex<()>,
    dirty: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl KnowledgeGraph {
    /// Open a knowledge graph persisted under `config.persist_directory`,
    /// loading the existing snapshot if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if the
    /// directory cannot be created or read,
    /// [`GraphError::Serialization`](crate::GraphError::Serialization) if the
    /// snapshot is corrupt, and
    /// [`GraphError::InvalidOperation`](crate::GraphError::InvalidOperation)
    /// if the snapshot file name is not usable.
    pub fn open(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let persistence =
            PersistenceManager::open_dir(&config.persist_directory, config.io_timeout)?;
        Self::with_persistence(config, persistence)
    }

    /// Open a knowledge graph over an explicit persistence manager.
    pub fn with_persistence(config: GraphConfig, persistence: PersistenceManager) -> Result<Self> {
        config.validate()?;
        let graph = GraphStore::new(config.capacity());
        let loaded = persistence.load(&graph, &config.snapshot_file)?;
        info!(
            "Opened knowledge graph ({}): {} nodes, {} edges",
            if loaded { "restored" } else { "new" },
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self::from_parts(graph, persistence, config))
    }

    /// An empty knowledge graph whose snapshots stay in memory.
    pub fn in_memory(config: GraphConfig) -> Self {
        let graph = GraphStore::new(config.capacity());
        Self::from_parts(graph, PersistenceManager::in_memory(), config)
    }

    fn from_parts(graph: GraphStore, persistence: PersistenceManager, config: GraphConfig) -> Self {
        Self {
            graph,
            persistence,
            config,
            writer: Mutex::new(()),
            dirty: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// The underlying graph, for relationship traversal and ad-hoc queries.
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// The configuration this graph was opened with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Node and edge counts of the underlying graph.
    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }

    /// Whether the in-memory graph has changes the last save did not persist.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// The most recent persistence failure, cleared by the next successful save.
    pub fn last_persistence_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|poisoned| {
            warn!("Document writer lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    fn save(&self) -> Result<()> {
        let result = self.persistence.save(&self.graph, &self.config.snapshot_file);
        let mut last_error = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(()) => {
                self.dirty.store(false, Ordering::SeqCst);
                *last_error = None;
            }
            Err(e) => {
                self.dirty.store(true, Ordering::SeqCst);
                *last_error = Some(e.to_string());
            }
        }
        result
    }

    /// Save after a mutation. In non-strict mode a failure is recorded and
    /// the mutation still succeeds.
    fn persist_after_mutation(&self) -> Result<()> {
        match self.save() {
            Ok(()) => Ok(()),
            Err(e) if self.config.strict_persistence => Err(e),
            Err(e) => {
                warn!("Failed to persist knowledge graph; changes kept in memory: {e}");
                Ok(())
            }
        }
    }

    /// Save the graph now.
    ///
    /// # Errors
    ///
    /// Returns the persistence error regardless of `strict_persistence`.
    pub fn flush(&self) -> Result<()> {
        self.save()
    }

    fn timestamp() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn find_entity(&self, name: &str) -> Option<NodeId> {
        self.graph
            .query()
            .node_type(ENTITY_TYPE)
            .property("name", name)
            .limit(1)
            .execute()
            .into_iter()
            .next()
            .map(|node| node.id)
    }

    /// Extract entities from `content` and link them to `doc_id`.
    fn link_entities(&self, doc_id: &str, content: &str) -> Result<usize> {
        let entities = extract_entities(content);
        let extracted_at = Self::timestamp();

        for name in &entities {
            let existing = if self.config.deduplicate_entities {
                self.find_entity(name)
            } else {
                None
            };
            let entity_id = match existing {
                Some(id) => id,
                None => {
                    let id = GraphStore::new_node_id();
                    self.graph.add_node(
                        id.clone(),
                        ENTITY_TYPE,
                        PropertyMap::new()
                            .with("name", name.as_str())
                            .with("extracted_at", extracted_at.as_str()),
                    )?;
                    id
                }
            };
            self.graph
                .add_edge(doc_id, &entity_id, CONTAINS_EDGE, PropertyMap::new())?;
        }

        debug!("Linked {} entities to document {doc_id}", entities.len());
        Ok(entities.len())
    }

    /// Store `content` as a new document and link its entities.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CapacityExceeded`](crate::GraphError::CapacityExceeded)
    /// if the graph cannot hold any node,
    /// [`GraphError::InvalidOperation`](crate::GraphError::InvalidOperation) if
    /// the metadata holds a NaN or infinite float, and persistence errors in
    /// strict mode.
    pub fn store(&self, content: &str, metadata: PropertyMap) -> Result<Document> {
        metadata.ensure_finite()?;
        let _writer = self.lock_writer();

        let id = GraphStore::new_node_id();
        let now = Utc::now();
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut metadata = metadata;
        metadata.insert("created_at", stamp.as_str());
        metadata.insert("updated_at", stamp.as_str());

        let properties = PropertyMap::new()
            .with("content", content)
            .with("metadata", metadata);
        let document = Document::from_properties(&id, &properties, now);

        self.graph.add_node(id.clone(), DOCUMENT_TYPE, properties)?;
        let entities = self.link_entities(&id, content)?;
        info!("Stored document {id} with {entities} entities");

        self.persist_after_mutation()?;
        Ok(document)
    }

    /// Rank documents against `query`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidQuery`](crate::GraphError::InvalidQuery)
    /// if the options are malformed.
    pub fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<QueryResult>> {
        options.validate()?;
        let query_words = word_set(query);

        let mut results = match options.search_type {
            SearchType::Keyword => self.keyword_hits(&query_words, options.min_score),
            SearchType::Entity => self.entity_hits(&query_words, options.min_score),
        };

        // Stable, so equal scores keep scan order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(options.limit);
        debug!(
            "Retrieved {} documents for {} query",
            results.len(),
            options.search_type
        );
        Ok(results)
    }

    fn keyword_hits(&self, query_words: &HashSet<String>, min_score: f64) -> Vec<QueryResult> {
        let inner = self.graph.read();
        inner
            .nodes_by_age()
            .filter_map(Document::from_node)
            .filter_map(|document| {
                let score = jaccard(query_words, &word_set(&document.content));
                (score >= min_score).then(|| QueryResult {
                    document,
                    score,
                    metadata: PropertyMap::new().with("search_type", SearchType::Keyword.as_str()),
                })
            })
            .collect()
    }

    fn entity_hits(&self, query_words: &HashSet<String>, min_score: f64) -> Vec<QueryResult> {
        let inner = self.graph.read();
        let mut results = Vec::new();

        for entity in inner
            .nodes_by_age()
            .filter(|node| node.node_type == ENTITY_TYPE)
        {
            let name = entity.properties.get_string("name").unwrap_or_default();
            let score = jaccard(query_words, &word_set(name));
            if score < min_score {
                continue;
            }

            for edge in inner.incoming(&entity.id, Some(CONTAINS_EDGE)) {
                let Some(document) = inner.nodes.get(&edge.source).and_then(Document::from_node)
                else {
                    continue;
                };
                results.push(QueryResult {
                    document,
                    score,
                    metadata: PropertyMap::new()
                        .with("search_type", SearchType::Entity.as_str())
                        .with("entity", name),
                });
            }
        }
        results
    }

    /// Replace the content and/or merge metadata of a document.
    ///
    /// New content drops the document's `"contains"` edges and links freshly
    /// extracted entities; the old entity nodes are kept. Returns `Ok(None)`
    /// if `id` is not a document.
    pub fn update(
        &self,
        id: &str,
        content: Option<&str>,
        metadata: Option<PropertyMap>,
    ) -> Result<Option<Document>> {
        let _writer = self.lock_writer();

        let Some(node) = self.graph.get_node(id) else {
            return Ok(None);
        };
        let Some(current) = Document::from_node(&node) else {
            return Ok(None);
        };
        if content.is_none() && metadata.is_none() {
            return Ok(Some(current));
        }
        if let Some(metadata) = &metadata {
            metadata.ensure_finite()?;
        }

        let stamp = Self::timestamp();
        let updated = self.graph.modify_node_properties(id, |_, properties| {
            if let Some(content) = content {
                properties.insert("content", content);
            }
            let mut doc_metadata = properties.get_map("metadata").cloned().unwrap_or_default();
            if let Some(metadata) = metadata {
                doc_metadata.extend(metadata);
            }
            doc_metadata.insert("updated_at", stamp.as_str());
            properties.insert("metadata", doc_metadata);
            Document::from_properties(id, properties, node.created_at)
        });
        let Some(updated) = updated else {
            return Ok(None);
        };

        if let Some(content) = content {
            let stale: Vec<NodeId> = self
                .graph
                .get_neighbors(id, Some(CONTAINS_EDGE))
                .into_iter()
                .map(|(entity, _)| entity.id)
                .collect();
            for entity_id in &stale {
                self.graph.remove_edge(id, entity_id);
            }
            debug!("Dropped {} entity links of document {id}", stale.len());
            self.link_entities(id, content)?;
        }

        info!("Updated document {id}");
        self.persist_after_mutation()?;
        Ok(Some(updated))
    }

    /// Delete a document and its `"contains"` edges.
    ///
    /// Entity nodes are kept. Returns `Ok(false)` if `id` is not a document.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let _writer = self.lock_writer();

        let is_document = self
            .graph
            .get_node(id)
            .is_some_and(|node| node.node_type == DOCUMENT_TYPE);
        if !is_document || !self.graph.remove_node(id) {
            return Ok(false);
        }

        info!("Deleted document {id}");
        self.persist_after_mutation()?;
        Ok(true)
    }

    /// Documents, newest first, skipping `offset` and returning at most `limit`.
    pub fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        let mut documents: Vec<(Document, u64)> = {
            let inner = self.graph.read();
            inner
                .nodes_by_age()
                .filter_map(|node| {
                    let document = Document::from_node(node)?;
                    let seq = inner.node_sequence(&node.id).unwrap_or_default();
                    Some((document, seq))
                })
                .collect()
        };

        documents.sort_by(|(a, a_seq), (b, b_seq)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });
        Ok(documents
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(document, _)| document)
            .collect())
    }

    /// Run a final save.
    ///
    /// # Errors
    ///
    /// Returns the persistence error regardless of `strict_persistence`.
    pub fn close(&self) -> Result<()> {
        let _writer = self.lock_writer();
        self.save()?;
        info!(
            "Closed knowledge graph: {} nodes, {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        Ok(())
    }
}

impl DocumentStorage for KnowledgeGraph {
    fn name(&self) -> &str {
        "knowledge_graph"
    }

    fn store(&self, content: &str, metadata: PropertyMap) -> Result<Document> {
        KnowledgeGraph::store(self, content, metadata)
    }

    fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<QueryResult>> {
        KnowledgeGraph::retrieve(self, query, options)
    }

    fn update(
        &self,
        id: &str,
        content: Option<&str>,
        metadata: Option<PropertyMap>,
    ) -> Result<Option<Document>> {
        KnowledgeGraph::update(self, id, content, metadata)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        KnowledgeGraph::delete(self, id)
    }

    fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>> {
        KnowledgeGraph::list_documents(self, limit, offset)
    }

    fn close(&self) -> Result<()> {
        KnowledgeGraph::close(self)
    }
}
