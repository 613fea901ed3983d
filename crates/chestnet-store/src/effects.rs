//! Record store interface
//!
//! The storage primitive underneath the registry: string keys mapped to small
//! byte records, each written atomically. Handlers are synchronous because
//! every registry mutation persists before it returns.

use chestnet_core::ChestnetError;

/// Errors reported by record store handlers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The key cannot be used with this handler
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Why the key was refused
        reason: String,
    },

    /// Reading a record failed
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Writing a record failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Removing a record failed
    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

impl From<StorageError> for ChestnetError {
    fn from(err: StorageError) -> Self {
        ChestnetError::storage(err.to_string())
    }
}

/// Atomic keyed record storage
pub trait RecordStore {
    /// Write one record, replacing any previous value
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Read one record
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove one record, returning whether it existed
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys, optionally restricted to a prefix, in sorted order
    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Check whether a record exists
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key)?.is_some())
    }
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value)
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }

    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix)
    }
}

pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            reason: "Key cannot be empty".to_string(),
        });
    }
    Ok(())
}
