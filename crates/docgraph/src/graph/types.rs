//! Core graph types: nodes, edges and IDs.

use super::property::{PropertyMap, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a node (caller supplied or generated UUID).
pub type NodeId = String;

/// Unique identifier for an edge (monotonic counter, never reused).
pub type EdgeId = u64;

/// A node in the graph.
///
/// The type is an open tag; the store itself does not interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Open type tag, e.g. "document" or "entity"
    pub node_type: String,
    /// Flexible key-value metadata
    pub properties: PropertyMap,
    /// Insertion time (assigned by the store)
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Create a new node.
    pub fn new(
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        properties: PropertyMap,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties,
            created_at,
        }
    }

    /// Add or update a property.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key, value);
    }

    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A directed edge in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier (assigned by the store)
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    /// Open relationship tag, e.g. "contains"
    pub edge_type: String,
    /// Optional metadata
    pub properties: PropertyMap,
    /// Insertion time (assigned by the store)
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge.
    pub fn new(
        id: EdgeId,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        edge_type: impl Into<String>,
        properties: PropertyMap,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            properties,
            created_at,
        }
    }

    /// Whether `node_id` is either endpoint of this edge.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// Summary counts returned by [`GraphStore::stats`](super::GraphStore::stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes
    pub node_count: usize,
    /// Number of edges
    pub edge_count: usize,
    /// Number of distinct node types
    pub node_type_count: usize,
    /// Number of distinct edge types
    pub edge_type_count: usize,
}

/// One hop of a path returned by [`find_path`](super::algorithms::find_path).
///
/// `edge` leads from `node` to the next step; it is `None` on the last step.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    /// Node at this position in the path
    pub node: Node,
    /// Outgoing edge to the next node, absent on the final step
    pub edge: Option<Edge>,
}
