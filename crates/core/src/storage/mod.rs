//! Key-value storage layer
//!
//! Every collection is persisted as one JSON blob under a well-known key.
//! Stores read the whole blob, mutate it in memory and write it back.

mod file_store;
mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::Result;

pub use file_store::FileKvStore;
pub use memory::MemoryKvStore;

/// Well-known storage keys
pub mod keys {
    pub const USERS: &str = "users";
    pub const TASKS: &str = "tasks";
    pub const CURRENT_USER: &str = "currentUser";
}

/// A key written or removed by some holder of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
}

/// Persistent string-valued key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Change feed for backends shared between several holders.
    fn watch(&self) -> Option<broadcast::Receiver<StorageChange>> {
        None
    }
}

/// Read and deserialize the blob under `key`
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(content) => Ok(Some(serde_json::from_str(&content)?)),
        None => Ok(None),
    }
}

/// Serialize `value` and store it under `key`
pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let content = serde_json::to_string(value)?;
    tracing::debug!(key, bytes = content.len(), "persisting blob");
    store.set(key, content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryKvStore::new();
        assert!(read_json::<Vec<u32>>(&store, "numbers").await.unwrap().is_none());

        write_json(&store, "numbers", &vec![1_u32, 2, 3]).await.unwrap();
        let numbers: Vec<u32> = read_json(&store, "numbers").await.unwrap().unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_malformed_blob_fails_hard() {
        let store = MemoryKvStore::new();
        store.set("numbers", "[1, 2,".to_string()).await.unwrap();

        let result = read_json::<Vec<u32>>(&store, "numbers").await;
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
