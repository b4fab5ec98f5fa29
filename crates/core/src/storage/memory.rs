//! In-memory key-value store
//!
//! Clones share the same map, so several application contexts holding one
//! store behave like browser tabs over the same local storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::{KeyValueStore, StorageChange};
use crate::Result;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    fn notify(&self, key: &str) {
        // No receivers is fine
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), value);
        }
        self.notify(key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let removed = {
            let mut entries = self.entries.write().await;
            entries.remove(key).is_some()
        };
        if removed {
            self.notify(key);
        }
        Ok(())
    }

    fn watch(&self) -> Option<broadcast::Receiver<StorageChange>> {
        Some(self.changes.subscribe())
    }
}
