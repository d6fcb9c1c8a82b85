//! Size limits and age-based eviction.
//!
//! Eviction is FIFO by `created_at` (ties broken by insertion order), not
//! LRU: reading a node does not refresh its age. Evicting a node always
//! removes its incident edges.

use super::store::GraphInner;
use super::types::{EdgeId, NodeId};
use crate::error::{GraphError, Result};
use log::trace;
use serde::{Deserialize, Serialize};

/// Maximum node and edge counts for a [`GraphStore`](super::GraphStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityManager {
    max_nodes: usize,
    max_edges: usize,
}

/// Ids removed by one enforcement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eviction {
    /// Evicted node ids, oldest first
    pub nodes: Vec<NodeId>,
    /// Evicted edge ids, including edges removed by node cascade
    pub edges: Vec<EdgeId>,
}

impl Eviction {
    /// True if nothing was evicted.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Total number of evicted nodes and edges.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }
}

impl Default for CapacityManager {
    fn default() -> Self {
        Self::new(100_000, 500_000)
    }
}

impl CapacityManager {
    /// Create limits for nodes and edges.
    pub fn new(max_nodes: usize, max_edges: usize) -> Self {
        Self {
            max_nodes,
            max_edges,
        }
    }

    /// No practical limit.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, usize::MAX)
    }

    /// Maximum number of nodes.
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Maximum number of edges.
    pub fn max_edges(&self) -> usize {
        self.max_edges
    }

    /// Fails if no node could ever be kept, whatever is evicted.
    pub fn ensure_node_room(&self) -> Result<()> {
        if self.max_nodes == 0 {
            return Err(GraphError::CapacityExceeded {
                kind: "node",
                limit: 0,
            });
        }
        Ok(())
    }

    /// Fails if no edge could ever be kept, whatever is evicted.
    pub fn ensure_edge_room(&self) -> Result<()> {
        if self.max_edges == 0 {
            return Err(GraphError::CapacityExceeded {
                kind: "edge",
                limit: 0,
            });
        }
        Ok(())
    }

    /// Evict oldest nodes, then oldest edges, until both limits hold.
    pub(crate) fn enforce(&self, graph: &mut GraphInner) -> Eviction {
        let mut eviction = Eviction::default();

        while graph.nodes.len() > self.max_nodes {
            let Some(oldest) = graph.oldest_node() else {
                break;
            };
            trace!("Evicting node {oldest}");
            if let Some((node, edges)) = graph.remove_node(&oldest) {
                eviction.nodes.push(node.id);
                eviction.edges.extend(edges.into_iter().map(|e| e.id));
            }
        }

        while graph.edges.len() > self.max_edges {
            let Some(oldest) = graph.oldest_edge() else {
                break;
            };
            trace!("Evicting edge {oldest}");
            if let Some(edge) = graph.remove_edge_by_id(oldest) {
                eviction.edges.push(edge.id);
            }
        }

        eviction
    }
}
