//! Current-session pointer
//!
//! The logged-in user's public projection, kept under its own storage key so
//! it survives restarts until an explicit logout.

use std::sync::Arc;

use crate::storage::{self, keys, KeyValueStore};
use crate::user::PublicUser;
use crate::Result;

#[derive(Clone)]
pub struct Session {
    kv: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// The logged-in user, if any
    pub async fn current(&self) -> Result<Option<PublicUser>> {
        storage::read_json(self.kv.as_ref(), keys::CURRENT_USER).await
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.current().await?.is_some())
    }

    pub async fn set(&self, user: &PublicUser) -> Result<()> {
        storage::write_json(self.kv.as_ref(), keys::CURRENT_USER, user).await
    }

    /// Drop the pointer. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(keys::CURRENT_USER).await
    }
}
