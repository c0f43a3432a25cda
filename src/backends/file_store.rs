// Key-value store persisted as one JSON document
// Every write replaces the file through a temp file in the same directory

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::components::{KeyValueStore, NotificationError, NotificationResult};

/// Durable `KeyValueStore` backed by a JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the document at `path`, starting empty if it does not exist
    ///
    /// A document that exists but cannot be parsed is reported as a
    /// `StorageError` rather than silently discarded.
    pub fn open(path: impl Into<PathBuf>) -> NotificationResult<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| storage_error(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(storage_error(&path, e)),
        };

        tracing::debug!(path = %path.display(), keys = values.len(), "Opened key-value document");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_document(&self, values: &BTreeMap<String, String>) -> NotificationResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| storage_error(&self.path, e))?;

        let json = serde_json::to_string_pretty(values).map_err(|e| storage_error(&self.path, e))?;
        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| storage_error(&self.path, e))?;
        temp.write_all(json.as_bytes())
            .map_err(|e| storage_error(&self.path, e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| storage_error(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| storage_error(&self.path, e.error))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> NotificationResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> NotificationResult<()> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.write_document(&values) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> NotificationResult<()> {
        let mut values = self.values.lock();
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.write_document(&values) {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> NotificationError {
    NotificationError::StorageError {
        key: path.display().to_string(),
        message: e.to_string(),
    }
}
