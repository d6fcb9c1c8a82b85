//! Graph traversal algorithms.
//!
//! Provides bounded breadth-first path finding over outgoing edges.

use super::store::{GraphInner, GraphStore};
use super::types::{EdgeId, NodeId, PathStep};
use std::collections::{HashMap, HashSet, VecDeque};

/// Find a shortest path from `source` to `target` of at most `max_depth` hops.
///
/// The search is breadth-first over outgoing edges. The result alternates
/// node/edge pairs and ends with a node-only step, so a path of `k` hops has
/// `k + 1` steps. `source == target` yields a single step for any depth.
///
/// Returns `None` if either endpoint is missing or no path exists within the
/// bound. Among several shortest paths, the one reached first in visitation
/// order is returned; which one that is should not be relied on.
pub fn find_path(
    graph: &GraphStore,
    source: &str,
    target: &str,
    max_depth: usize,
) -> Option<Vec<PathStep>> {
    let inner = graph.read();
    if !inner.nodes.contains_key(source) || !inner.nodes.contains_key(target) {
        return None;
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut parents: HashMap<&str, (&str, EdgeId)> = HashMap::new();
    let mut queue = VecDeque::new();

    visited.insert(source);
    queue.push_back((source, 0usize)); // (node_id, depth)

    while let Some((current, depth)) = queue.pop_front() {
        if current == target {
            return Some(build_path(&inner, source, target, &parents));
        }

        // Check depth limit
        if depth >= max_depth {
            continue;
        }

        for edge in inner.outgoing(current, None) {
            let next = edge.target.as_str();
            if visited.insert(next) {
                parents.insert(next, (current, edge.id));
                queue.push_back((next, depth + 1));
            }
        }
    }

    None
}

/// Walk parent links back from `target` and materialize the path steps.
fn build_path(
    inner: &GraphInner,
    source: &str,
    target: &str,
    parents: &HashMap<&str, (&str, EdgeId)>,
) -> Vec<PathStep> {
    let mut hops: Vec<(NodeId, Option<EdgeId>)> = vec![(target.to_string(), None)];
    let mut current = target;
    while current != source {
        let Some(&(parent, edge_id)) = parents.get(current) else {
            break;
        };
        hops.push((parent.to_string(), Some(edge_id)));
        current = parent;
    }
    hops.reverse();

    hops.into_iter()
        .filter_map(|(node_id, edge_id)| {
            let node = inner.nodes.get(&node_id)?.clone();
            let edge = edge_id.and_then(|id| inner.edges.get(&id)).cloned();
            Some(PathStep { node, edge })
        })
        .collect()
}
