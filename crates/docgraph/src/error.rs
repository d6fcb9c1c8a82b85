//! Error types for docgraph operations.
//!
//! All fallible operations return [`Result<T>`]. Lookups that simply find
//! nothing are not errors: they return `None`, an empty `Vec` or `false`.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for docgraph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type for all graph, document and persistence operations.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Snapshot or config file I/O failed
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Snapshot or config could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An edge endpoint does not exist in the graph
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// ID of the missing node
        node_id: String,
    },

    /// A live node already uses this id
    #[error("Duplicate node id: {node_id}")]
    DuplicateNode {
        /// The conflicting id
        node_id: String,
    },

    /// Eviction cannot bring the graph within its configured limit
    #[error("Capacity exceeded: cannot hold any {kind} (limit {limit})")]
    CapacityExceeded {
        /// "node" or "edge"
        kind: &'static str,
        /// The configured maximum
        limit: usize,
    },

    /// Retrieval options were rejected
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// What was wrong with the query
        message: String,
    },

    /// Persistence I/O did not finish in time
    #[error("Timed out after {after:?} during {operation}")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// The configured timeout
        after: Duration,
    },

    /// Invalid operation
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of what went wrong
        message: String,
    },
}

impl GraphError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create an invalid-query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// True for disk I/O failures and timeouts; false for integrity,
    /// capacity and validation errors.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Timeout { .. })
    }
}
