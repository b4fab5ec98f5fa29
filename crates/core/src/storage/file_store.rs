//! File-based key-value storage implementation
//!
//! Stores each key as `<key>.json` inside a data directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::{Error, Result};

/// File-based key-value store
#[derive(Debug, Clone)]
pub struct FileKvStore {
    /// Directory holding one file per key
    dir: PathBuf,
}

impl FileKvStore {
    /// Create a new FileKvStore
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !valid {
            return Err(Error::InvalidInput(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::StorageUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Some(content))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;

        // Ensure parent directory exists
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::StorageUnavailable(format!("Failed to create directory: {}", e))
        })?;

        // Write a sibling file first so readers never observe a torn blob
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, value).await.map_err(|e| {
            Error::StorageUnavailable(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        tokio::fs::rename(&staging, &path).await.map_err(|e| {
            Error::StorageUnavailable(format!("Failed to replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await.map_err(|e| {
                Error::StorageUnavailable(format!("Failed to remove {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKvStore::new(temp_dir.path().join("data"));

        assert!(store.get("tasks").await.unwrap().is_none());

        store.set("tasks", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("tasks").await.unwrap(), Some("[]".to_string()));
        assert!(temp_dir.path().join("data").join("tasks.json").exists());
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();

        {
            let store = FileKvStore::new(temp_dir.path());
            store
                .set("currentUser", r#"{"id":1}"#.to_string())
                .await
                .unwrap();
        }

        let store = FileKvStore::new(temp_dir.path());
        assert_eq!(
            store.get("currentUser").await.unwrap(),
            Some(r#"{"id":1}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKvStore::new(temp_dir.path());

        store.set("users", "[]".to_string()).await.unwrap();
        store.remove("users").await.unwrap();
        assert!(store.get("users").await.unwrap().is_none());

        // Removing an absent key is fine
        store.remove("users").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKvStore::new(temp_dir.path());

        let result = store.set("../escape", "x".to_string()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_file_store_has_no_change_feed() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKvStore::new(temp_dir.path());
        assert!(store.watch().is_none());
    }
}
