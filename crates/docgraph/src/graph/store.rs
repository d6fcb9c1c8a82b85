//! Type-agnostic node/edge storage with adjacency indexes.

use super::algorithms;
use super::capacity::{CapacityManager, Eviction};
use super::property::PropertyMap;
use super::types::{Edge, EdgeId, GraphStats, Node, NodeId, PathStep};
use crate::error::{GraphError, Result};
use crate::query::{EdgeQuery, QueryBuilder};
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ordering key for age-based eviction: creation time, then insertion sequence.
pub(crate) type AgeKey = (DateTime<Utc>, u64);

/// The unlocked graph collections.
///
/// Nodes live in an id-indexed map; edges are referenced from per-node
/// outgoing/incoming id lists, so no structure holds pointers to another.
#[derive(Debug, Default)]
pub(crate) struct GraphInner {
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<EdgeId, Edge>,
    pub(crate) adjacency_out: HashMap<NodeId, Vec<EdgeId>>,
    pub(crate) adjacency_in: HashMap<NodeId, Vec<EdgeId>>,
    edge_pairs: HashMap<(NodeId, NodeId), EdgeId>,
    node_age: BTreeMap<AgeKey, NodeId>,
    node_keys: HashMap<NodeId, AgeKey>,
    edge_age: BTreeMap<AgeKey, EdgeId>,
    pub(crate) next_edge_id: EdgeId,
    next_seq: u64,
    last_stamp: Option<DateTime<Utc>>,
}

impl GraphInner {
    /// Current time, clamped so stamps never go backwards.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn observe_stamp(&mut self, stamp: DateTime<Utc>) {
        if self.last_stamp.map_or(true, |last| stamp > last) {
            self.last_stamp = Some(stamp);
        }
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        let key = (node.created_at, self.next_seq);
        self.next_seq += 1;
        self.observe_stamp(node.created_at);
        self.node_age.insert(key, node.id.clone());
        self.node_keys.insert(node.id.clone(), key);
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert an edge whose endpoints are known to exist.
    ///
    /// An existing edge for the same ordered pair is replaced.
    pub(crate) fn insert_edge(&mut self, edge: Edge) {
        let pair = (edge.source.clone(), edge.target.clone());
        if let Some(old_id) = self.edge_pairs.get(&pair).copied() {
            trace!("Replacing edge {old_id} between {} and {}", pair.0, pair.1);
            self.remove_edge_by_id(old_id);
        }

        self.observe_stamp(edge.created_at);
        if edge.id >= self.next_edge_id {
            self.next_edge_id = edge.id + 1;
        }
        self.adjacency_out
            .entry(edge.source.clone())
            .or_default()
            .push(edge.id);
        self.adjacency_in
            .entry(edge.target.clone())
            .or_default()
            .push(edge.id);
        self.edge_age.insert((edge.created_at, edge.id), edge.id);
        self.edge_pairs.insert(pair, edge.id);
        self.edges.insert(edge.id, edge);
    }

    pub(crate) fn remove_edge_by_id(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        if let Some(out_edges) = self.adjacency_out.get_mut(&edge.source) {
            out_edges.retain(|e| *e != id);
        }
        if let Some(in_edges) = self.adjacency_in.get_mut(&edge.target) {
            in_edges.retain(|e| *e != id);
        }
        self.edge_age.remove(&(edge.created_at, id));
        self.edge_pairs
            .remove(&(edge.source.clone(), edge.target.clone()));
        Some(edge)
    }

    /// Remove a node and every edge incident to it.
    pub(crate) fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<Edge>)> {
        let node = self.nodes.remove(id)?;
        if let Some(key) = self.node_keys.remove(id) {
            self.node_age.remove(&key);
        }

        let mut incident = self.adjacency_out.remove(id).unwrap_or_default();
        incident.extend(self.adjacency_in.remove(id).unwrap_or_default());

        let removed: Vec<Edge> = incident
            .into_iter()
            .filter_map(|edge_id| self.remove_edge_by_id(edge_id))
            .collect();
        trace!("Removed node {id} with {} incident edges", removed.len());

        Some((node, removed))
    }

    pub(crate) fn oldest_node(&self) -> Option<NodeId> {
        self.node_age.values().next().cloned()
    }

    pub(crate) fn oldest_edge(&self) -> Option<EdgeId> {
        self.edge_age.values().next().copied()
    }

    /// Nodes in insertion (age) order.
    pub(crate) fn nodes_by_age(&self) -> impl Iterator<Item = &Node> {
        self.node_age.values().filter_map(|id| self.nodes.get(id))
    }

    /// Edges in insertion (age) order.
    pub(crate) fn edges_by_age(&self) -> impl Iterator<Item = &Edge> {
        self.edge_age.values().filter_map(|id| self.edges.get(id))
    }

    /// Insertion sequence of a node, used as a tie-breaker by callers.
    pub(crate) fn node_sequence(&self, id: &str) -> Option<u64> {
        self.node_keys.get(id).map(|(_, seq)| *seq)
    }

    fn edges_from<'a>(
        &'a self,
        ids: Option<&'a Vec<EdgeId>>,
        edge_type: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(move |edge| edge_type.map_or(true, |t| edge.edge_type == t))
    }

    pub(crate) fn outgoing<'a>(
        &'a self,
        id: &str,
        edge_type: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges_from(self.adjacency_out.get(id), edge_type)
    }

    pub(crate) fn incoming<'a>(
        &'a self,
        id: &str,
        edge_type: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges_from(self.adjacency_in.get(id), edge_type)
    }

    /// Empty every collection; counters survive so ids are never reused.
    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.adjacency_out.clear();
        self.adjacency_in.clear();
        self.edge_pairs.clear();
        self.node_age.clear();
        self.node_keys.clear();
        self.edge_age.clear();
    }
}

/// Outcome of replacing the graph contents from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Nodes restored
    pub nodes: usize,
    /// Edges restored
    pub edges: usize,
    /// Edges skipped because an endpoint was missing
    pub dangling_edges: usize,
    /// Entries evicted to fit the configured capacity
    pub evicted: usize,
}

/// In-process graph store.
///
/// All methods take `&self`; the collections sit behind a read/write lock so
/// lookups proceed concurrently while mutations are exclusive. Capacity is
/// enforced inside every insertion, so callers never observe an oversized
/// store.
#[derive(Debug)]
pub struct GraphStore {
    inner: RwLock<GraphInner>,
    capacity: CapacityManager,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(CapacityManager::unbounded())
    }
}

impl GraphStore {
    /// Create an empty store with the given limits.
    pub fn new(capacity: CapacityManager) -> Self {
        Self {
            inner: RwLock::new(GraphInner::default()),
            capacity,
        }
    }

    /// Create an empty store bounded to `max_nodes` and `max_edges`.
    pub fn with_limits(max_nodes: usize, max_edges: usize) -> Self {
        Self::new(CapacityManager::new(max_nodes, max_edges))
    }

    /// The capacity limits in force.
    pub fn capacity(&self) -> CapacityManager {
        self.capacity
    }

    /// Generate a fresh node id.
    pub fn new_node_id() -> NodeId {
        uuid::Uuid::new_v4().to_string()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, GraphInner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!("Graph lock poisoned; continuing with recovered state");
            PoisonError::into_inner(poisoned)
        })
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, GraphInner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!("Graph lock poisoned; continuing with recovered state");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Add a node to the graph.
    ///
    /// `created_at` is assigned here. If the store is full, the oldest nodes
    /// (and their edges) are evicted before this call returns.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateNode`] if a live node already has this id.
    /// - [`GraphError::CapacityExceeded`] if `max_nodes` is zero; nothing is
    ///   inserted in that case.
    /// - [`GraphError::InvalidOperation`] if a property is a NaN or infinite
    ///   float.
    pub fn add_node(
        &self,
        id: impl Into<NodeId>,
        node_type: impl Into<String>,
        properties: PropertyMap,
    ) -> Result<()> {
        let id = id.into();
        let node_type = node_type.into();
        properties.ensure_finite()?;
        self.capacity.ensure_node_room()?;

        let mut inner = self.write();
        if inner.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode { node_id: id });
        }

        debug!("Adding node: id={id}, type={node_type}");
        let created_at = inner.stamp();
        inner.insert_node(Node::new(id, node_type, properties, created_at));

        let eviction = self.capacity.enforce(&mut inner);
        log_eviction(&eviction);
        Ok(())
    }

    /// Add a directed edge between two existing nodes.
    ///
    /// An existing edge between the same ordered pair is replaced. Returns
    /// the id assigned to the new edge.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NodeNotFound`] if either endpoint is missing; the edge
    ///   collection is left unchanged.
    /// - [`GraphError::CapacityExceeded`] if `max_edges` is zero.
    /// - [`GraphError::InvalidOperation`] if a property is a NaN or infinite
    ///   float.
    pub fn add_edge(
        &self,
        source: &str,
        target: &str,
        edge_type: impl Into<String>,
        properties: PropertyMap,
    ) -> Result<EdgeId> {
        let edge_type = edge_type.into();
        properties.ensure_finite()?;
        let mut inner = self.write();

        for endpoint in [source, target] {
            if !inner.nodes.contains_key(endpoint) {
                return Err(GraphError::NodeNotFound {
                    node_id: endpoint.to_string(),
                });
            }
        }
        self.capacity.ensure_edge_room()?;

        let edge_id = inner.next_edge_id;
        debug!("Adding edge {edge_id}: source={source}, target={target}, type={edge_type}");
        let created_at = inner.stamp();
        inner.insert_edge(Edge::new(
            edge_id, source, target, edge_type, properties, created_at,
        ));

        let eviction = self.capacity.enforce(&mut inner);
        log_eviction(&eviction);
        Ok(edge_id)
    }

    /// Get a node by id.
    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.read().nodes.get(id).cloned()
    }

    /// Get the edge from `source` to `target`, if any.
    pub fn get_edge(&self, source: &str, target: &str) -> Option<Edge> {
        let inner = self.read();
        inner
            .edge_pairs
            .get(&(source.to_string(), target.to_string()))
            .and_then(|id| inner.edges.get(id))
            .cloned()
    }

    /// Check whether a node exists.
    pub fn contains_node(&self, id: &str) -> bool {
        self.read().nodes.contains_key(id)
    }

    /// Outgoing neighbors of `id`, optionally restricted to one edge type.
    ///
    /// A missing node has no neighbors.
    pub fn get_neighbors(&self, id: &str, edge_type: Option<&str>) -> Vec<(Node, Edge)> {
        let inner = self.read();
        inner
            .outgoing(id, edge_type)
            .filter_map(|edge| {
                inner
                    .nodes
                    .get(&edge.target)
                    .map(|node| (node.clone(), edge.clone()))
            })
            .collect()
    }

    /// Incoming neighbors of `id`, optionally restricted to one edge type.
    pub fn get_predecessors(&self, id: &str, edge_type: Option<&str>) -> Vec<(Node, Edge)> {
        let inner = self.read();
        inner
            .incoming(id, edge_type)
            .filter_map(|edge| {
                inner
                    .nodes
                    .get(&edge.source)
                    .map(|node| (node.clone(), edge.clone()))
            })
            .collect()
    }

    /// Remove a node and all edges incident to it.
    ///
    /// Returns whether the node existed.
    pub fn remove_node(&self, id: &str) -> bool {
        debug!("Removing node: id={id}");
        self.write().remove_node(id).is_some()
    }

    /// Remove the edge from `source` to `target`.
    ///
    /// Returns whether such an edge existed.
    pub fn remove_edge(&self, source: &str, target: &str) -> bool {
        let mut inner = self.write();
        let Some(edge_id) = inner
            .edge_pairs
            .get(&(source.to_string(), target.to_string()))
            .copied()
        else {
            return false;
        };
        debug!("Removing edge {edge_id}: source={source}, target={target}");
        inner.remove_edge_by_id(edge_id).is_some()
    }

    /// Merge `properties` into an existing node (overwrites duplicates).
    ///
    /// Returns `Ok(false)` if the node does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidOperation`] if a property is a NaN or
    /// infinite float; the node is left unchanged.
    pub fn update_node_properties(&self, id: &str, properties: PropertyMap) -> Result<bool> {
        properties.ensure_finite()?;
        Ok(self
            .modify_node_properties(id, |_, props| props.extend(properties))
            .is_some())
    }

    /// Run `f` on a node's type and properties under the write lock.
    ///
    /// Returns `None` if the node does not exist. Values written here are not
    /// checked; a non-finite float makes the next snapshot save fail.
    pub fn modify_node_properties<R>(
        &self,
        id: &str,
        f: impl FnOnce(&str, &mut PropertyMap) -> R,
    ) -> Option<R> {
        let mut inner = self.write();
        let node = inner.nodes.get_mut(id)?;
        Some(f(&node.node_type, &mut node.properties))
    }

    /// Start a fluent node query.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    /// Start a fluent edge query.
    pub fn query_edges_builder(&self) -> EdgeQuery<'_> {
        EdgeQuery::new(self)
    }

    /// Nodes matching an optional type and an exact-match property filter.
    pub fn query_nodes(
        &self,
        node_type: Option<&str>,
        properties: Option<&PropertyMap>,
    ) -> Vec<Node> {
        let mut query = self.query();
        if let Some(node_type) = node_type {
            query = query.node_type(node_type);
        }
        if let Some(properties) = properties {
            query = query.properties(properties.clone());
        }
        query.execute()
    }

    /// Edges matching an optional type and an exact-match property filter.
    pub fn query_edges(
        &self,
        edge_type: Option<&str>,
        properties: Option<&PropertyMap>,
    ) -> Vec<Edge> {
        let mut query = self.query_edges_builder();
        if let Some(edge_type) = edge_type {
            query = query.edge_type(edge_type);
        }
        if let Some(properties) = properties {
            query = query.properties(properties.clone());
        }
        query.execute()
    }

    /// Shortest path from `source` to `target` of at most `max_depth` hops.
    pub fn find_path(&self, source: &str, target: &str, max_depth: usize) -> Option<Vec<PathStep>> {
        algorithms::find_path(self, source, target, max_depth)
    }

    /// All nodes, oldest first.
    pub fn nodes(&self) -> Vec<Node> {
        self.read().nodes_by_age().cloned().collect()
    }

    /// All edges, oldest first.
    pub fn edges(&self) -> Vec<Edge> {
        self.read().edges_by_age().cloned().collect()
    }

    /// Get the total number of nodes.
    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    /// Get the total number of edges.
    pub fn edge_count(&self) -> usize {
        self.read().edges.len()
    }

    /// Counts of nodes, edges and their distinct types.
    pub fn stats(&self) -> GraphStats {
        let inner = self.read();
        let node_types: HashSet<&str> = inner.nodes.values().map(|n| n.node_type.as_str()).collect();
        let edge_types: HashSet<&str> = inner.edges.values().map(|e| e.edge_type.as_str()).collect();
        GraphStats {
            node_count: inner.nodes.len(),
            edge_count: inner.edges.len(),
            node_type_count: node_types.len(),
            edge_type_count: edge_types.len(),
        }
    }

    /// Remove all nodes and edges.
    ///
    /// The edge id counter is kept, so ids handed out before the clear are
    /// never assigned again.
    pub fn clear(&self) {
        debug!("Clearing graph");
        self.write().clear();
    }

    /// Capture nodes and edges (oldest first) plus the edge id counter.
    pub(crate) fn export_parts(&self) -> (Vec<Node>, Vec<Edge>, EdgeId) {
        let inner = self.read();
        (
            inner.nodes_by_age().cloned().collect(),
            inner.edges_by_age().cloned().collect(),
            inner.next_edge_id,
        )
    }

    /// Replace the whole graph with restored contents.
    ///
    /// Nodes keep their recorded `created_at`; their relative order in
    /// `nodes` breaks timestamp ties. Edges whose endpoints are absent are
    /// dropped, and capacity is enforced afterwards.
    pub(crate) fn restore(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        next_edge_id: EdgeId,
    ) -> RestoreReport {
        let mut fresh = GraphInner {
            next_edge_id,
            ..GraphInner::default()
        };
        let mut report = RestoreReport::default();

        for node in nodes {
            if fresh.nodes.contains_key(&node.id) {
                warn!("Skipping duplicate node {} in snapshot", node.id);
                continue;
            }
            fresh.insert_node(node);
            report.nodes += 1;
        }
        for edge in edges {
            if !fresh.nodes.contains_key(&edge.source) || !fresh.nodes.contains_key(&edge.target) {
                warn!(
                    "Dropping dangling edge {} ({} -> {})",
                    edge.id, edge.source, edge.target
                );
                report.dangling_edges += 1;
                continue;
            }
            fresh.insert_edge(edge);
        }

        let eviction = self.capacity.enforce(&mut fresh);
        log_eviction(&eviction);
        report.evicted = eviction.len();
        report.nodes = fresh.nodes.len();
        report.edges = fresh.edges.len();

        *self.write() = fresh;
        report
    }
}

fn log_eviction(eviction: &Eviction) {
    if !eviction.is_empty() {
        debug!(
            "Evicted {} nodes and {} edges to stay within capacity",
            eviction.nodes.len(),
            eviction.edges.len()
        );
    }
}
