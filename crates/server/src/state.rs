//! Application state

use std::sync::Arc;
use std::time::Duration;

use taskdesk_core::config::StorageBackend;
use taskdesk_core::AppContext;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    ctx: AppContext,
    auth_delay: Duration,
    storage: StorageBackend,
}

impl AppState {
    pub fn new(ctx: AppContext, config: &ServerConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                ctx,
                auth_delay: config.auth_delay,
                storage: config.core.storage,
            }),
        }
    }

    /// Open storage as configured and build the state around it
    pub async fn from_config(config: &ServerConfig) -> taskdesk_core::Result<Self> {
        let ctx = AppContext::from_config(&config.core).await?;
        Ok(Self::new(ctx, config))
    }

    pub fn ctx(&self) -> &AppContext {
        &self.inner.ctx
    }

    pub fn auth_delay(&self) -> Duration {
        self.inner.auth_delay
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner.storage
    }

    /// Seeded in-memory state for route tests
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        use taskdesk_core::storage::MemoryKvStore;
        use taskdesk_core::ContextOptions;

        let ctx = AppContext::init(Arc::new(MemoryKvStore::new()), ContextOptions::default())
            .await
            .unwrap();
        let config = ServerConfig {
            core: taskdesk_core::config::CoreConfig {
                storage: StorageBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        };
        Self::new(ctx, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_core::config::CoreConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn from_config_opens_file_storage() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            core: CoreConfig {
                data_dir: temp_dir.path().to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        };

        let state = AppState::from_config(&config).await.unwrap();
        assert_eq!(state.storage_backend(), StorageBackend::File);
        assert_eq!(state.ctx().users().all_users().await.unwrap().len(), 3);
        assert!(temp_dir.path().join("users.json").exists());
    }
}
