//! Core graph types and operations.
//!
//! This module defines the fundamental building blocks:
//! - [`Node`] and [`Edge`]: typed, property-carrying graph elements
//! - [`GraphStore`]: the locked, capacity-bounded store
//! - [`CapacityManager`]: age-based eviction limits
//! - [`algorithms`]: bounded path finding

mod capacity;
mod property;
mod store;
mod types;
pub mod algorithms;

pub use capacity::{CapacityManager, Eviction};
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphStore, RestoreReport};
pub use types::{Edge, EdgeId, GraphStats, Node, NodeId, PathStep};

