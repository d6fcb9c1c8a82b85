//! Query builders for fluent graph queries.
//!
//! Filters are combined with AND and evaluated by a linear scan over the
//! store in insertion order, under a single read lock.

use crate::graph::{Edge, GraphStore, Node, PropertyMap, PropertyValue};

/// A filter predicate that can be applied to nodes.
type FilterFn = Box<dyn Fn(&Node) -> bool>;

/// A filter predicate that can be applied to edges.
type EdgeFilterFn = Box<dyn Fn(&Edge) -> bool>;

/// Fluent query builder for nodes.
///
/// # Examples
///
/// ```
/// use docgraph::{GraphStore, PropertyMap};
///
/// let graph = GraphStore::default();
/// graph.add_node("e1", "entity", PropertyMap::new().with("name", "Paris")).unwrap();
///
/// let entities = graph.query()
///     .node_type("entity")
///     .property("name", "Paris")
///     .execute();
/// assert_eq!(entities.len(), 1);
/// ```
pub struct QueryBuilder<'a> {
    graph: &'a GraphStore,
    filters: Vec<FilterFn>,
    limit_value: Option<usize>,
}

impl<'a> QueryBuilder<'a> {
    /// Create a new query builder for the given graph.
    pub fn new(graph: &'a GraphStore) -> Self {
        Self {
            graph,
            filters: Vec::new(),
            limit_value: None,
        }
    }

    /// Filter nodes by type tag.
    pub fn node_type(mut self, node_type: &str) -> Self {
        let node_type = node_type.to_string();
        self.filters.push(Box::new(move |node| node.node_type == node_type));
        self
    }

    /// Filter nodes by exact property match.
    pub fn property<V: Into<PropertyValue>>(mut self, key: &str, value: V) -> Self {
        let key = key.to_string();
        let value = value.into();

        self.filters.push(Box::new(move |node| {
            node.properties
                .get(&key)
                .is_some_and(|prop_value| prop_value.matches(&value))
        }));
        self
    }

    /// Filter nodes whose properties contain every entry of `properties`.
    pub fn properties(mut self, properties: PropertyMap) -> Self {
        self.filters
            .push(Box::new(move |node| node.properties.matches_all(&properties)));
        self
    }

    /// Filter nodes that have a specific property (regardless of value).
    pub fn property_exists(mut self, key: &str) -> Self {
        let key = key.to_string();
        self.filters
            .push(Box::new(move |node| node.properties.contains_key(&key)));
        self
    }

    /// Filter nodes by name containing a substring (case-insensitive).
    pub fn name_contains(mut self, substring: &str) -> Self {
        let substring = substring.to_lowercase();
        self.filters.push(Box::new(move |node| {
            node.properties
                .get_string("name")
                .is_some_and(|name| name.to_lowercase().contains(&substring))
        }));
        self
    }

    /// Filter nodes using a custom predicate function.
    ///
    /// ```
    /// # use docgraph::{GraphStore, PropertyMap};
    /// # let graph = GraphStore::default();
    /// let long_documents = graph.query()
    ///     .node_type("document")
    ///     .custom(|node| {
    ///         node.properties
    ///             .get_string("content")
    ///             .is_some_and(|c| c.len() > 1_000)
    ///     })
    ///     .execute();
    /// # assert!(long_documents.is_empty());
    /// ```
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Limit the number of results returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_value = Some(n);
        self
    }

    /// Execute the query and return matching nodes, oldest first.
    pub fn execute(&self) -> Vec<Node> {
        let limit = self.limit_value.unwrap_or(usize::MAX);
        let inner = self.graph.read();
        inner
            .nodes_by_age()
            .filter(|node| self.matches_filters(node))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Count the number of matching nodes without cloning them.
    pub fn count(&self) -> usize {
        let inner = self.graph.read();
        inner
            .nodes_by_age()
            .filter(|node| self.matches_filters(node))
            .count()
    }

    /// Check if any nodes match the query (short-circuits on first match).
    pub fn exists(&self) -> bool {
        let inner = self.graph.read();
        let found = inner.nodes_by_age().any(|node| self.matches_filters(node));
        found
    }

    /// Check if a node matches all filters.
    fn matches_filters(&self, node: &Node) -> bool {
        self.filters.iter().all(|filter| filter(node))
    }
}

/// Fluent query builder for edges.
pub struct EdgeQuery<'a> {
    graph: &'a GraphStore,
    filters: Vec<EdgeFilterFn>,
    limit_value: Option<usize>,
}

impl<'a> EdgeQuery<'a> {
    /// Create a new edge query for the given graph.
    pub fn new(graph: &'a GraphStore) -> Self {
        Self {
            graph,
            filters: Vec::new(),
            limit_value: None,
        }
    }

    /// Filter edges by type tag.
    pub fn edge_type(mut self, edge_type: &str) -> Self {
        let edge_type = edge_type.to_string();
        self.filters.push(Box::new(move |edge| edge.edge_type == edge_type));
        self
    }

    /// Filter edges leaving `source`.
    pub fn from_node(mut self, source: &str) -> Self {
        let source = source.to_string();
        self.filters.push(Box::new(move |edge| edge.source == source));
        self
    }

    /// Filter edges entering `target`.
    pub fn to_node(mut self, target: &str) -> Self {
        let target = target.to_string();
        self.filters.push(Box::new(move |edge| edge.target == target));
        self
    }

    /// Filter edges by exact property match.
    pub fn property<V: Into<PropertyValue>>(mut self, key: &str, value: V) -> Self {
        let key = key.to_string();
        let value = value.into();
        self.filters.push(Box::new(move |edge| {
            edge.properties
                .get(&key)
                .is_some_and(|prop_value| prop_value.matches(&value))
        }));
        self
    }

    /// Filter edges whose properties contain every entry of `properties`.
    pub fn properties(mut self, properties: PropertyMap) -> Self {
        self.filters
            .push(Box::new(move |edge| edge.properties.matches_all(&properties)));
        self
    }

    /// Filter edges using a custom predicate function.
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Edge) -> bool + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Limit the number of results returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_value = Some(n);
        self
    }

    /// Execute the query and return matching edges, oldest first.
    pub fn execute(&self) -> Vec<Edge> {
        let limit = self.limit_value.unwrap_or(usize::MAX);
        let inner = self.graph.read();
        inner
            .edges_by_age()
            .filter(|edge| self.filters.iter().all(|filter| filter(edge)))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Count matching edges.
    pub fn count(&self) -> usize {
        let inner = self.graph.read();
        inner
            .edges_by_age()
            .filter(|edge| self.filters.iter().all(|filter| filter(edge)))
            .count()
    }
}
