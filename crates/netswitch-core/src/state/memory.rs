// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// ## Purpose
//
// A fast store that does not survive restarts. Used by tests and by
// embedders that persist the configuration through their own mechanism
// (e.g. a desktop shell's local storage) and only hand the value in at start.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::config_store::{ConfigStore, StoredEntry};

/// In-memory config store implementation
///
/// Clones share the same underlying map.
///
/// # Example
///
/// ```rust,no_run
/// use netswitch_core::state::MemoryConfigStore;
/// use netswitch_core::traits::ConfigStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryConfigStore::new();
///     store.set("autoSwitchConfig", &serde_json::json!({ "enabled": true })).await?;
///     assert!(store.get("autoSwitchConfig").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<HashMap<String, StoredEntry>>>,
}

impl MemoryConfigStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one value
    pub fn with_value(key: &str, value: serde_json::Value) -> Self {
        let mut map = HashMap::new();
        map.insert(key.to_string(), StoredEntry::new(value));
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Get the number of stored keys
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).map(|entry| entry.value.clone()))
    }

    async fn get_entry(&self, key: &str) -> Result<Option<StoredEntry>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), StoredEntry::new(value.clone()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryConfigStore::new();
        assert!(store.is_empty().await);

        store.set("autoSwitchConfig", &json!({ "enabled": true })).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get("autoSwitchConfig").await.unwrap(),
            Some(json!({ "enabled": true }))
        );

        store.delete("autoSwitchConfig").await.unwrap();
        assert!(store.get("autoSwitchConfig").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryConfigStore::new();
        let other = store.clone();
        store.set("k", &json!(1)).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(other.list_keys().await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_entry_carries_write_time() {
        let store = MemoryConfigStore::with_value("k", json!("v"));
        let entry = store.get_entry("k").await.unwrap().unwrap();
        assert_eq!(entry.value, json!("v"));
        assert!(entry.updated_at <= chrono::Utc::now());
    }
}
