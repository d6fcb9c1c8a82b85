//! In-memory snapshot store for testing.
//!
//! **Note**: This store is for testing only. All data is lost when the last
//! clone is dropped.

use super::SnapshotStore;
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory snapshot store using a BTreeMap.
///
/// Clones share the same data, so a test can keep a handle and inspect what
/// a [`PersistenceManager`](super::PersistenceManager) wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemorySnapshotStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of snapshots stored.
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name))
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}
