// In-process key-value store

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::components::{KeyValueStore, NotificationResult};

/// `KeyValueStore` kept in memory; contents are lost with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `values`
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> NotificationResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> NotificationResult<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> NotificationResult<()> {
        self.values.write().remove(key);
        Ok(())
    }
}
