//! Whole-graph snapshot persistence.
//!
//! This module defines the [`SnapshotStore`] trait and provides implementations:
//! - [`FileSnapshotStore`]: one file per snapshot in a directory, written atomically
//! - [`MemorySnapshotStore`]: in-memory storage for testing
//!
//! [`PersistenceManager`] serializes the complete graph to JSON and hands the
//! bytes to a store. Every save rewrites the full snapshot; there is no
//! incremental log.

mod file;
mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use crate::error::{GraphError, Result};
use crate::graph::{Edge, EdgeId, GraphStore, Node};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Version written into every snapshot; loading any other version fails.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Trait defining where snapshot bytes live.
///
/// Implementations must make `write` all-or-nothing: a reader sees either
/// the previous snapshot or the new one, never a partial file.
pub trait SnapshotStore: Send + Sync {
    /// Replace the snapshot called `name` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the write fails and
    /// [`GraphError::Timeout`] if it does not finish in time.
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Read the snapshot called `name`.
    ///
    /// Returns `Ok(None)` if it does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Check if a snapshot exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Delete a snapshot. Does not error if it is missing (idempotent).
    fn remove(&self, name: &str) -> Result<()>;
}

/// On-disk representation of a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version, see [`SNAPSHOT_FORMAT_VERSION`]
    pub format_version: u32,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Next edge id to hand out, so ids are not reused after a restart
    pub next_edge_id: EdgeId,
    /// Nodes, oldest first
    pub nodes: Vec<Node>,
    /// Edges, oldest first
    pub edges: Vec<Edge>,
}

/// Saves and restores a [`GraphStore`] through a [`SnapshotStore`].
pub struct PersistenceManager {
    backend: Box<dyn SnapshotStore>,
    // Serializes saves so a slower, older save never lands after a newer one
    save_lock: Mutex<()>,
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager").finish_non_exhaustive()
    }
}

impl PersistenceManager {
    /// Create a manager over any snapshot store.
    pub fn new(backend: Box<dyn SnapshotStore>) -> Self {
        Self {
            backend,
            save_lock: Mutex::new(()),
        }
    }

    /// Persist snapshots as files under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the directory cannot be created.
    pub fn open_dir(dir: impl AsRef<Path>, io_timeout: Option<Duration>) -> Result<Self> {
        let backend = FileSnapshotStore::open(dir, io_timeout)?;
        Ok(Self::new(Box::new(backend)))
    }

    /// Keep snapshots in memory (testing only).
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySnapshotStore::new()))
    }

    /// Serialize the complete graph and write it as `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Serialization`] if encoding fails or a property
    /// holds a NaN or infinite float, or whatever the backend reports for the
    /// write.
    pub fn save(&self, graph: &GraphStore, filename: &str) -> Result<()> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (nodes, edges, next_edge_id) = graph.export_parts();
        let non_finite = nodes
            .iter()
            .find_map(|node| node.properties.non_finite_key().map(|key| (node.id.clone(), key)))
            .or_else(|| {
                edges.iter().find_map(|edge| {
                    edge.properties
                        .non_finite_key()
                        .map(|key| (format!("edge {}", edge.id), key))
                })
            });
        if let Some((owner, key)) = non_finite {
            // JSON would store these as null, which does not load back
            return Err(GraphError::serialization(
                format!("Property '{key}' of {owner} holds a non-finite float"),
                None::<std::io::Error>,
            ));
        }
        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            next_edge_id,
            nodes,
            edges,
        };
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| GraphError::serialization("Failed to serialize snapshot", Some(e)))?;

        debug!(
            "Saving snapshot {filename}: {} nodes, {} edges, {} bytes",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            bytes.len()
        );
        self.backend.write(filename, &bytes)
    }

    /// Replace the graph with the snapshot stored as `filename`.
    ///
    /// Returns `Ok(false)` and leaves the graph empty if there is no such
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Serialization`] if the snapshot is corrupt or of
    /// an unknown version; the graph is left untouched in that case.
    pub fn load(&self, graph: &GraphStore, filename: &str) -> Result<bool> {
        let Some(bytes) = self.backend.read(filename)? else {
            info!("No snapshot {filename}; starting with an empty graph");
            graph.clear();
            return Ok(false);
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
            GraphError::serialization(format!("Failed to deserialize snapshot {filename}"), Some(e))
        })?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(GraphError::serialization(
                format!(
                    "Unsupported snapshot version {} (expected {SNAPSHOT_FORMAT_VERSION})",
                    snapshot.format_version
                ),
                None::<std::io::Error>,
            ));
        }

        let report = graph.restore(snapshot.nodes, snapshot.edges, snapshot.next_edge_id);
        info!(
            "Loaded snapshot {filename}: {} nodes, {} edges ({} dangling dropped, {} evicted)",
            report.nodes, report.edges, report.dangling_edges, report.evicted
        );
        Ok(true)
    }

    /// Check whether a snapshot called `filename` exists.
    pub fn exists(&self, filename: &str) -> Result<bool> {
        self.backend.exists(filename)
    }

    /// Delete the snapshot called `filename`.
    pub fn remove(&self, filename: &str) -> Result<()> {
        self.backend.remove(filename)
    }
}
