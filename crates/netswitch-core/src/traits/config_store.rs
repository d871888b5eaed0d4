// # Config Store Trait
//
// Defines the interface for persisting JSON values under application keys.
//
// ## Purpose
//
// The auto-switch configuration is one JSON object stored under a single
// key (`autoSwitchConfig`). The store knows nothing about its shape:
// normalisation and migration are done by `ProfileStore`.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes and backup recovery
// - Memory: for tests and embedders that persist elsewhere
//
// ## Usage
//
// ```rust,ignore
// use netswitch_core::ConfigStore;
//
// store.set("autoSwitchConfig", &serde_json::json!({ "enabled": false })).await?;
// let value = store.get("autoSwitchConfig").await?;
// ```

use async_trait::async_trait;

/// A stored value with its last write time
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoredEntry {
    pub value: serde_json::Value,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StoredEntry {
    /// Wrap a value stamped with the current time
    ///
    /// `pub(crate)` so entries are only minted by store implementations.
    pub(crate) fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Trait for config store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// - ✅ Perform I/O for persistent storage
/// - ✅ Implement locking for thread safety
/// - ❌ Interpret or migrate stored values (owned by `ProfileStore`)
/// - ❌ Spawn background tasks
///
/// Writes are expected to be durable when `set` returns; `flush` persists
/// anything an implementation chose to buffer.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, crate::Error>;

    /// Get the value together with its write time
    async fn get_entry(&self, key: &str) -> Result<Option<StoredEntry>, crate::Error>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), crate::Error>;

    /// Delete `key` (succeeds if it did not exist)
    async fn delete(&self, key: &str) -> Result<(), crate::Error>;

    /// List all stored keys
    async fn list_keys(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
