//! Filesystem record store
//!
//! Each record is a file `{base}/{key}.dat`. Keys may contain `/`, which map
//! to subdirectories. Writes go to a sibling `.tmp` file that is synced and
//! then renamed over the record, so a record is either old or new, never torn.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use crate::effects::{check_key, RecordStore, StorageError};

const RECORD_EXTENSION: &str = "dat";

/// Filesystem-backed record store
#[derive(Debug, Clone)]
pub struct FilesystemRecordStore {
    base_path: PathBuf,
}

impl FilesystemRecordStore {
    /// Create a handler rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Root directory of the store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey {
                reason: format!("Key must be a relative path without '..': {key}"),
            });
        }
        Ok(self.base_path.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    fn collect_keys(&self, dir: &Path, keys: &mut Vec<String>) -> Result<(), StorageError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read directory: {e}"
                )))
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read directory entry: {e}"))
            })?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| {
                StorageError::ReadFailed(format!("Failed to stat {}: {e}", path.display()))
            })?;

            if file_type.is_dir() {
                self.collect_keys(&path, keys)?;
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let stem = path.with_extension("");
            let Ok(relative) = stem.strip_prefix(&self.base_path) else {
                continue;
            };
            let key = relative
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
        Ok(())
    }
}

impl RecordStore for FilesystemRecordStore {
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let file_path = self.record_path(key)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::WriteFailed(format!("Failed to create directory: {e}"))
            })?;
        }

        let temp_path = file_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to create temp file: {e}")))?;
        file.write_all(&value)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write temp file: {e}")))?;
        file.sync_all()
            .map_err(|e| StorageError::WriteFailed(format!("Failed to sync temp file: {e}")))?;
        drop(file);

        fs::rename(&temp_path, &file_path)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to rename temp file: {e}")))
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.record_path(key)?;
        match fs::read(&file_path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!("Failed to read file: {e}"))),
        }
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.record_path(key)?;
        match fs::remove_file(&file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove file: {e}"
            ))),
        }
    }

    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        self.collect_keys(&self.base_path, &mut keys)?;
        if let Some(prefix) = prefix {
            keys.retain(|k| k.starts_with(prefix));
        }
        keys.sort();
        Ok(keys)
    }
}
