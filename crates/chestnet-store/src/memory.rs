//! In-memory record store
//!
//! Clones share the same records, so a test can hand one handle to a
//! registry, drop it, and reopen from another handle to observe what was
//! persisted.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::effects::{check_key, RecordStore, StorageError};

/// In-memory record store
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Length of the largest record, in bytes
    pub fn largest_record(&self) -> usize {
        self.data.read().values().map(Vec::len).max().unwrap_or(0)
    }
}

impl RecordStore for MemoryRecordStore {
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        check_key(key)?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read();
        let keys = match prefix {
            Some(prefix) => data
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            None => data.keys().cloned().collect(),
        };
        Ok(keys)
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.read().contains_key(key))
    }
}
