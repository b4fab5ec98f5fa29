//! Application context
//!
//! Holds everything a UI needs: the shared storage, the notification bus,
//! the session pointer and both stores. Create one with
//! [`AppContext::init`] and stop it with [`AppContext::shutdown`].

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::events::{EventBus, Notification};
use crate::session::Session;
use crate::storage::KeyValueStore;
use crate::task::TaskStore;
use crate::user::{PublicUser, UserStore};
use crate::Result;

/// Startup options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Write the default accounts when no user collection exists yet
    pub seed_users: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self { seed_users: true }
    }
}

pub struct AppContext {
    events: EventBus,
    session: Session,
    users: UserStore,
    tasks: TaskStore,
    restored_user: Option<PublicUser>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Seed storage, restore the session and start listening for writes
    /// made by other holders of the same storage.
    pub async fn init(kv: Arc<dyn KeyValueStore>, options: ContextOptions) -> Result<Self> {
        let events = EventBus::new();
        let session = Session::new(Arc::clone(&kv));
        let users = UserStore::new(Arc::clone(&kv), session.clone(), events.clone());
        let tasks = TaskStore::new(Arc::clone(&kv), events.clone());

        if options.seed_users {
            users.seed_defaults().await?;
        }
        tasks.seed_defaults().await?;

        let restored_user = session.current().await?;
        match &restored_user {
            Some(user) => info!(user_id = %user.id, username = %user.username, "restored session"),
            None => debug!("no session to restore"),
        }

        let forwarder = spawn_storage_forwarder(kv.as_ref(), events.clone());

        Ok(Self {
            events,
            session,
            users,
            tasks,
            restored_user,
            forwarder: Mutex::new(forwarder),
        })
    }

    pub async fn from_config(config: &CoreConfig) -> Result<Self> {
        info!(
            storage = config.storage.as_str(),
            data_dir = %config.data_dir.display(),
            "opening storage"
        );
        Self::init(
            config.open_store(),
            ContextOptions {
                seed_users: config.seed_users,
            },
        )
        .await
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Session found in storage when the context started
    pub fn restored_user(&self) -> Option<&PublicUser> {
        self.restored_user.as_ref()
    }

    /// Stop forwarding storage changes. Idempotent.
    pub fn shutdown(&self) {
        let handle = self
            .forwarder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("storage change forwarder stopped");
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_storage_forwarder(kv: &dyn KeyValueStore, events: EventBus) -> Option<JoinHandle<()>> {
    let mut changes = kv.watch()?;
    Some(tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => events.publish(Notification::StorageChanged { key: change.key }),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "storage change feed lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }))
}
