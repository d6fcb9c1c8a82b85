//! # docgraph
//!
//! An embedded knowledge graph that stores documents, extracts the entities
//! they mention, and retrieves documents by similarity.
//!
//! ## Core Principles
//!
//! - **Bounded**: Node and edge counts never exceed their limits; the oldest
//!   entries are evicted first
//! - **Integrity**: An edge never outlives either of its endpoints
//! - **Explicit Persistence**: The whole graph is snapshotted to a JSON file
//!   after each document mutation, atomically
//! - **No Pointers**: Nodes live in id-indexed maps and edges refer to them
//!   by id
//!
//! ## Architecture
//!
//! ```text
//! Document Layer (KnowledgeGraph: store, retrieve, update, delete)
//!     ↓
//! Query Builder (fluent interface)
//!     ↓
//! Core Graph (GraphStore, CapacityManager, path finding)
//!     ↓
//! Persistence (JSON snapshots: file, memory)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use docgraph::{GraphConfig, KnowledgeGraph, PropertyMap, RetrieveOptions};
//!
//! let kg = KnowledgeGraph::open(GraphConfig::new("./data/graph")).unwrap();
//!
//! kg.store("The Eiffel Tower is in Paris", PropertyMap::new()).unwrap();
//! kg.store("Paris hosts many museums", PropertyMap::new()).unwrap();
//!
//! let hits = kg
//!     .retrieve("Paris museums", &RetrieveOptions::keyword().with_min_score(0.1))
//!     .unwrap();
//! for hit in hits {
//!     println!("{:.2} {}", hit.score, hit.document.content);
//! }
//!
//! kg.close().unwrap();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod persistence;
pub mod query;

// Re-export main types
pub use config::GraphConfig;
pub use document::{
    extract_entities, jaccard_similarity, Document, DocumentStorage, KnowledgeGraph, QueryResult,
    RetrieveOptions, SearchType,
};
pub use error::{GraphError, Result};
pub use graph::{
    CapacityManager, Edge, EdgeId, GraphStats, GraphStore, Node, NodeId, PathStep, PropertyMap,
    PropertyValue,
};
pub use persistence::{FileSnapshotStore, MemorySnapshotStore, PersistenceManager, SnapshotStore};
pub use query::{EdgeQuery, QueryBuilder};
