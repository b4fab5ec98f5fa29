//! Environment-driven configuration for the data layer

use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::{FileKvStore, KeyValueStore, MemoryKvStore};

const DEFAULT_DATA_DIR: &str = ".taskdesk-data";

/// Which key-value backend holds the collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// `TASKDESK_DATA_DIR`
    pub data_dir: PathBuf,
    /// `TASKDESK_STORAGE`
    pub storage: StorageBackend,
    /// `TASKDESK_SEED_USERS`
    pub seed_users: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage: StorageBackend::default(),
            seed_users: true,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let data_dir = lookup("TASKDESK_DATA_DIR")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let storage = match lookup("TASKDESK_STORAGE")
            .map(|value| value.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("memory") => StorageBackend::Memory,
            _ => StorageBackend::File,
        };
        let seed_users = parse_flag(lookup("TASKDESK_SEED_USERS"), defaults.seed_users);

        Self {
            data_dir,
            storage,
            seed_users,
        }
    }

    /// Open the configured backend
    pub fn open_store(&self) -> Arc<dyn KeyValueStore> {
        match self.storage {
            StorageBackend::File => Arc::new(FileKvStore::new(self.data_dir.clone())),
            StorageBackend::Memory => Arc::new(MemoryKvStore::new()),
        }
    }
}

/// Interpret a boolean environment value, falling back to `default`
pub fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.data_dir, PathBuf::from(".taskdesk-data"));
        assert!(config.seed_users);
    }

    #[test]
    fn test_overrides() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("TASKDESK_DATA_DIR", "/tmp/td"),
            ("TASKDESK_STORAGE", "Memory"),
            ("TASKDESK_SEED_USERS", "off"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/td"));
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(!config.seed_users);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("YES".to_string()), false));
        assert!(!parse_flag(Some("0".to_string()), true));
        assert!(parse_flag(Some("maybe".to_string()), true));
        assert!(!parse_flag(None, false));
    }

    #[test]
    fn test_memory_backend_has_change_feed() {
        let config = CoreConfig {
            storage: StorageBackend::Memory,
            ..Default::default()
        };
        assert!(config.open_store().watch().is_some());
    }
}
