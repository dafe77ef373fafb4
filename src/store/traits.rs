//! `KeyValueStore` trait: the async get/set/delete capability set both
//! persistence adapters expose.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

/// Backend-agnostic string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Human-readable store name, used in log fields.
    fn name(&self) -> &str;

    /// Read a value. `Ok(None)` when the key is absent.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite a value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Deleting an absent key succeeds.
    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Read a key, logging and collapsing any failure to `None`.
pub async fn read_or_none(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get_item(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(store = store.name(), key, "Read failed, treating as missing: {}", e);
            None
        }
    }
}

/// Write a key; failures are logged and swallowed. Returns whether the write
/// landed.
pub async fn write_logged(store: &dyn KeyValueStore, key: &str, value: &str) -> bool {
    match store.set_item(key, value).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(store = store.name(), key, "Write failed: {}", e);
            false
        }
    }
}

/// The two process-wide stores, passed explicitly to whatever needs them.
#[derive(Clone)]
pub struct StoreContext {
    /// Credential-grade store (auth, completion flags, progress).
    pub secure: Arc<dyn KeyValueStore>,
    /// Bulk, non-sensitive store (aggregate state, preferences).
    pub general: Arc<dyn KeyValueStore>,
}

impl StoreContext {
    pub fn new(secure: Arc<dyn KeyValueStore>, general: Arc<dyn KeyValueStore>) -> Self {
        Self { secure, general }
    }
}
