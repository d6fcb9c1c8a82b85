//! Configuration for a [`KnowledgeGraph`](crate::KnowledgeGraph).

use crate::error::{GraphError, Result};
use crate::graph::CapacityManager;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for graph storage and persistence.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Directory holding the snapshot file (created if missing)
    pub persist_directory: PathBuf,

    /// Snapshot file name inside `persist_directory`
    pub snapshot_file: String,

    /// Maximum number of nodes before the oldest are evicted
    pub max_nodes: usize,

    /// Maximum number of edges before the oldest are evicted
    pub max_edges: usize,

    /// Timeout for a single snapshot read or write, in seconds in config
    /// files (fractions allowed; None = wait forever)
    #[serde(with = "duration_option")]
    pub io_timeout: Option<Duration>,

    /// Reuse an existing entity node with the same name instead of
    /// creating a new one per stored document
    pub deduplicate_entities: bool,

    /// Return persistence failures from mutating document calls instead of
    /// recording them as a warning
    pub strict_persistence: bool,
}

// Helper module for serializing Duration as fractional seconds
mod duration_option {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_secs_f64().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs: Option<f64> = Option::deserialize(deserializer)?;
        secs.map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| D::Error::custom(format!("invalid timeout {secs}: {e}")))
        })
        .transpose()
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        let capacity = CapacityManager::default();
        Self {
            persist_directory: PathBuf::from("./data/graph"),
            snapshot_file: "graph.json".to_string(),
            max_nodes: capacity.max_nodes(),
            max_edges: capacity.max_edges(),
            io_timeout: Some(Duration::from_secs(30)),
            deduplicate_entities: false,
            strict_persistence: false,
        }
    }
}

impl GraphConfig {
    /// Default config persisting under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            persist_directory: dir.into(),
            ..Default::default()
        }
    }

    /// Load a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the file cannot be read and
    /// [`GraphError::Serialization`] if it is not valid config JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            GraphError::storage(format!("Failed to read config {}", path.display()), Some(e))
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            GraphError::serialization(format!("Invalid config {}", path.display()), Some(e))
        })
    }

    /// Remove the node and edge limits.
    pub fn unbounded(mut self) -> Self {
        self.max_nodes = usize::MAX;
        self.max_edges = usize::MAX;
        self
    }

    /// Set node and edge limits
    pub fn with_capacity(mut self, max_nodes: usize, max_edges: usize) -> Self {
        self.max_nodes = max_nodes;
        self.max_edges = max_edges;
        self
    }

    /// Set the snapshot file name
    pub fn with_snapshot_file(mut self, name: impl Into<String>) -> Self {
        self.snapshot_file = name.into();
        self
    }

    /// Set the persistence I/O timeout
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Enable entity deduplication by name
    pub fn with_entity_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate_entities = enabled;
        self
    }

    /// Enable strict persistence error reporting
    pub fn with_strict_persistence(mut self, strict: bool) -> Self {
        self.strict_persistence = strict;
        self
    }

    /// The capacity limits as a [`CapacityManager`].
    pub fn capacity(&self) -> CapacityManager {
        CapacityManager::new(self.max_nodes, self.max_edges)
    }

    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.persist_directory.join(&self.snapshot_file)
    }

    /// Check that the config can be used to open a graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidOperation`] if `snapshot_file` is empty
    /// or is not a plain file name, or if `io_timeout` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.io_timeout == Some(Duration::ZERO) {
            return Err(GraphError::InvalidOperation {
                message: "io_timeout must be positive; use null to wait forever".to_string(),
            });
        }

        let name = Path::new(&self.snapshot_file);
        let is_plain = name.file_name().is_some_and(|f| f == name.as_os_str());
        if self.snapshot_file.is_empty() || !is_plain {
            return Err(GraphError::InvalidOperation {
                message: format!(
                    "snapshot_file must be a plain file name, got '{}'",
                    self.snapshot_file
                ),
            });
        }
        Ok(())
    }
}
