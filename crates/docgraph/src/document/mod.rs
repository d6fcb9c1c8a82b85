//! Documents and extracted entities on top of the graph.
//!
//! Stored content becomes a `"document"` node; capitalized tokens extracted
//! from it become `"entity"` nodes linked by `"contains"` edges. Retrieval
//! ranks documents by word-set similarity, either directly against their
//! content or through matching entities.

mod knowledge_graph;
mod text;

pub use knowledge_graph::KnowledgeGraph;
pub use text::{extract_entities, jaccard_similarity, word_set};

use crate::error::{GraphError, Result};
use crate::graph::{Node, PropertyMap, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Node type of stored documents.
pub const DOCUMENT_TYPE: &str = "document";

/// Node type of extracted entities.
pub const ENTITY_TYPE: &str = "entity";

/// Edge type from a document to each entity it mentions.
pub const CONTAINS_EDGE: &str = "contains";

/// A stored document as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document node id
    pub id: String,
    /// Raw text
    pub content: String,
    /// Caller metadata plus `created_at`/`updated_at`
    pub metadata: PropertyMap,
    /// When the document was stored
    pub created_at: DateTime<Utc>,
    /// When the document was last changed
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build the document view of a node, or `None` if it is not a document.
    pub fn from_node(node: &Node) -> Option<Self> {
        if node.node_type != DOCUMENT_TYPE {
            return None;
        }
        Some(Self::from_properties(&node.id, &node.properties, node.created_at))
    }

    /// Build a document view from document node properties.
    ///
    /// Timestamps come from the `created_at`/`updated_at` metadata strings;
    /// `fallback` is used when they are missing or unparsable.
    pub(crate) fn from_properties(
        id: &str,
        properties: &PropertyMap,
        fallback: DateTime<Utc>,
    ) -> Self {
        let content = properties.get_string("content").unwrap_or_default().to_string();
        let metadata = properties.get_map("metadata").cloned().unwrap_or_default();
        let created_at = parse_timestamp(&metadata, "created_at").unwrap_or(fallback);
        let updated_at = parse_timestamp(&metadata, "updated_at").unwrap_or(created_at);

        Self {
            id: id.to_string(),
            content,
            metadata,
            created_at,
            updated_at,
        }
    }
}

fn parse_timestamp(metadata: &PropertyMap, key: &str) -> Option<DateTime<Utc>> {
    let raw = metadata.get_string(key)?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// One ranked retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The matching document
    pub document: Document,
    /// Similarity in [0, 1]
    pub score: f64,
    /// How the hit was found (`search_type`, and `entity` for entity hits)
    pub metadata: PropertyMap,
}

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Score documents by their content
    #[default]
    Keyword,
    /// Score entities by name and return the documents containing them
    Entity,
}

impl SearchType {
    /// The wire name of this search type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Keyword => "keyword",
            SearchType::Entity => "entity",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keyword" => Ok(SearchType::Keyword),
            "entity" => Ok(SearchType::Entity),
            other => Err(GraphError::invalid_query(format!(
                "unknown search type '{other}' (expected 'keyword' or 'entity')"
            ))),
        }
    }
}

/// Options for [`KnowledgeGraph::retrieve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Minimum similarity for a hit to be kept
    pub min_score: f64,
    /// Retrieval strategy
    pub search_type: SearchType,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_score: 0.5,
            search_type: SearchType::Keyword,
        }
    }
}

impl RetrieveOptions {
    /// Keyword search with default limit and threshold.
    pub fn keyword() -> Self {
        Self::default()
    }

    /// Entity search with default limit and threshold.
    pub fn entity() -> Self {
        Self {
            search_type: SearchType::Entity,
            ..Self::default()
        }
    }

    /// Set the maximum number of results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the minimum score
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Parse options from a loosely typed map (`limit`, `min_score`,
    /// `search_type`). Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidQuery`] for an unknown search type, a
    /// negative limit, or a value of the wrong type.
    pub fn from_map(options: &PropertyMap) -> Result<Self> {
        let mut parsed = Self::default();

        match options.get("limit") {
            None => {}
            Some(PropertyValue::Int(n)) if *n >= 0 => parsed.limit = *n as usize,
            Some(other) => {
                return Err(GraphError::invalid_query(format!(
                    "limit must be a non-negative int, got {}",
                    other.type_name()
                )))
            }
        }

        match options.get("min_score") {
            None => {}
            Some(PropertyValue::Float(f)) => parsed.min_score = *f,
            Some(PropertyValue::Int(i)) => parsed.min_score = *i as f64,
            Some(other) => {
                return Err(GraphError::invalid_query(format!(
                    "min_score must be a number, got {}",
                    other.type_name()
                )))
            }
        }

        match options.get("search_type") {
            None => {}
            Some(PropertyValue::String(s)) => parsed.search_type = s.parse()?,
            Some(other) => {
                return Err(GraphError::invalid_query(format!(
                    "search_type must be a string, got {}",
                    other.type_name()
                )))
            }
        }

        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject options that cannot be evaluated.
    pub fn validate(&self) -> Result<()> {
        if self.min_score.is_nan() {
            return Err(GraphError::invalid_query("min_score must not be NaN"));
        }
        Ok(())
    }
}

/// The storage contract shared by document stores.
///
/// Callers can be written against `dyn DocumentStorage` and bound to the
/// graph-backed implementation or any other store with the same shape.
pub trait DocumentStorage: Send + Sync {
    /// Short identifier of the store.
    fn name(&self) -> &str;

    /// Store content with caller metadata.
    fn store(&self, content: &str, metadata: PropertyMap) -> Result<Document>;

    /// Rank stored documents against a query.
    fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<QueryResult>>;

    /// Replace content and/or merge metadata; `None` if no such document.
    fn update(
        &self,
        id: &str,
        content: Option<&str>,
        metadata: Option<PropertyMap>,
    ) -> Result<Option<Document>>;

    /// Delete a document; `false` if no such document.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Documents, newest first, paginated.
    fn list_documents(&self, limit: usize, offset: usize) -> Result<Vec<Document>>;

    /// Persist outstanding state and release resources.
    fn close(&self) -> Result<()>;
}
