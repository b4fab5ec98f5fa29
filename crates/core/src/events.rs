//! Change notification bus
//!
//! Views subscribe here to learn that a collection changed and must be
//! re-read. Listeners registered with [`EventBus::subscribe_fn`] run
//! synchronously inside [`EventBus::publish`]; async consumers take a
//! broadcast receiver from [`EventBus::subscribe`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::user::PublicUser;

const CHANNEL_CAPACITY: usize = 1000;

/// A change signal delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum Notification {
    /// Any task was created, updated, deleted or imported
    TasksUpdated,
    /// The session user's profile changed
    ProfileUpdated(PublicUser),
    /// Another holder of the shared storage wrote `key`
    #[serde(rename_all = "camelCase")]
    StorageChanged { key: String },
}

impl Notification {
    /// Event name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::TasksUpdated => "tasksUpdated",
            Self::ProfileUpdated(_) => "profileUpdated",
            Self::StorageChanged { .. } => "storageChanged",
        }
    }
}

/// Handle returned by [`EventBus::subscribe_fn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

struct EventBusInner {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<Notification>,
}

/// Process-local publish/subscribe hub
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EventBusInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                sender,
            }),
        }
    }

    /// Register a synchronous listener
    pub fn subscribe_fn<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Subscribe as an async consumer
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.sender.subscribe()
    }

    /// Number of synchronous listeners currently registered
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Deliver `notification` to every subscriber
    pub fn publish(&self, notification: Notification) {
        // Snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(
            event = notification.name(),
            listeners = listeners.len(),
            "publishing notification"
        );
        for listener in listeners {
            listener(&notification);
        }

        if self.inner.sender.receiver_count() > 0 && self.inner.sender.send(notification).is_err() {
            warn!("notification dropped: no async subscribers left");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
