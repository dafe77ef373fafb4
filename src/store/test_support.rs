//! Instrumented store fakes for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::memory::MemoryStore;
use super::traits::KeyValueStore;
use crate::error::StoreError;

/// `MemoryStore` wrapper that counts calls, can fail chosen keys, and can hold
/// reads until released.
pub struct RecordingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    removes: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    read_gate: Option<Semaphore>,
}

impl RecordingStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryStore::new(name),
            writes: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            read_gate: None,
        }
    }

    /// Reads block until `release_reads` is called.
    pub fn gated(name: &str) -> Self {
        Self {
            read_gate: Some(Semaphore::new(0)),
            ..Self::new(name)
        }
    }

    pub fn release_reads(&self) {
        if let Some(gate) = &self.read_gate {
            gate.add_permits(1024);
        }
    }

    /// Every call touching `key` fails from now on.
    pub fn fail_key(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.inner.get_item(key).await.unwrap()
    }

    /// Seed a value without counting it as a write.
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner.set_item(key, value).await.unwrap();
    }

    fn is_failing(&self, key: &str) -> bool {
        self.failing.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(gate) = &self.read_gate {
            let _permit = gate.acquire().await.map_err(|e| StoreError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        }
        if self.is_failing(key) {
            return Err(StoreError::Read {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.is_failing(key) {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        if self.is_failing(key) {
            return Err(StoreError::Delete {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.inner.remove_item(key).await
    }
}
