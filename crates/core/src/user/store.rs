//! User store
//!
//! Owns the `users` collection. Every operation re-reads the whole blob,
//! works on a private copy and writes the collection back in one piece.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::model::{default_users, NewUser, PublicUser, User, UserPatch, UserSummary};
use crate::events::{EventBus, Notification};
use crate::id::UserId;
use crate::session::Session;
use crate::storage::{self, keys, KeyValueStore};
use crate::{Error, Result};

const MIN_NEW_PASSWORD_LEN: usize = 3;

#[derive(Clone)]
pub struct UserStore {
    kv: Arc<dyn KeyValueStore>,
    session: Session,
    events: EventBus,
    /// Serializes read-modify-write cycles within this process
    write_lock: Arc<Mutex<()>>,
}

impl UserStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, session: Session, events: EventBus) -> Self {
        Self {
            kv,
            session,
            events,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write the default accounts if the collection has never been stored.
    ///
    /// Returns true when seeding happened.
    pub async fn seed_defaults(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.kv.get(keys::USERS).await?.is_some() {
            return Ok(false);
        }
        let users = default_users(Utc::now());
        self.save(&users).await?;
        info!(count = users.len(), "seeded default users");
        Ok(true)
    }

    async fn load(&self) -> Result<Vec<User>> {
        let users: Option<Vec<User>> = storage::read_json(self.kv.as_ref(), keys::USERS).await?;
        Ok(users.unwrap_or_default())
    }

    async fn save(&self, users: &[User]) -> Result<()> {
        storage::write_json(self.kv.as_ref(), keys::USERS, users).await
    }

    /// Create an account and log it in
    pub async fn register(&self, candidate: NewUser) -> Result<PublicUser> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        if users.iter().any(|u| u.username_matches(&candidate.username)) {
            return Err(Error::DuplicateUsername);
        }
        if users.iter().any(|u| u.email_matches(&candidate.email)) {
            return Err(Error::DuplicateEmail);
        }

        let id = users
            .iter()
            .map(|u| u.id)
            .max()
            .map(UserId::next)
            .unwrap_or(UserId::new(1));

        let user = User {
            id,
            username: candidate.username,
            password: candidate.password,
            name: candidate.name,
            email: candidate.email,
            avatar_color: None,
            theme: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let projection = user.session_projection();
        users.push(user);
        self.save(&users).await?;
        self.session.set(&projection).await?;

        info!(user_id = %projection.id, username = %projection.username, "user registered");
        Ok(projection)
    }

    /// Exact, case-sensitive credential check
    pub async fn login(&self, username: &str, password: &str) -> Result<PublicUser> {
        let users = self.load().await?;
        let Some(user) = users
            .iter()
            .find(|u| u.username == username && u.password == password)
        else {
            warn!(username, "login rejected");
            return Err(Error::InvalidCredentials);
        };

        let projection = user.session_projection();
        self.session.set(&projection).await?;
        info!(user_id = %projection.id, "user logged in");
        Ok(projection)
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        info!("user logged out");
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Option<PublicUser>> {
        self.session.current().await
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        self.session.is_authenticated().await
    }

    /// Full record, password included, for the profile editor
    pub async fn get_user_details(&self, id: UserId) -> Result<Option<User>> {
        debug!(user_id = %id, "loading user details");
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    /// Merge `patch` into the user's record.
    ///
    /// When the user is the session user the session pointer is refreshed and
    /// a `ProfileUpdated` notification is published.
    pub async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<PublicUser> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        let index = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

        if let Some(username) = &patch.username {
            if users
                .iter()
                .any(|u| u.id != id && u.username_matches(username))
            {
                return Err(Error::DuplicateUsername);
            }
        }
        if let Some(email) = &patch.email {
            if users.iter().any(|u| u.id != id && u.email_matches(email)) {
                return Err(Error::DuplicateEmail);
            }
        }

        users[index].apply(patch);
        let projection = users[index].public();
        self.save(&users).await?;

        let is_session_user = self
            .session
            .current()
            .await?
            .is_some_and(|current| current.id == id);
        if is_session_user {
            self.session.set(&projection).await?;
            self.events
                .publish(Notification::ProfileUpdated(projection.clone()));
        }

        info!(user_id = %id, "user profile updated");
        Ok(projection)
    }

    /// Replace the password after checking the current one
    pub async fn change_password(
        &self,
        id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<PublicUser> {
        let user = self
            .get_user_details(id)
            .await?
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

        if user.password != current_password {
            return Err(Error::InvalidInput(
                "Current password is incorrect".to_string(),
            ));
        }
        if new_password.chars().count() < MIN_NEW_PASSWORD_LEN {
            return Err(Error::InvalidInput(
                "Password must be at least 3 characters".to_string(),
            ));
        }

        self.update_user(
            id,
            UserPatch {
                password: Some(new_password.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Every user, for the assignee picker
    pub async fn all_users(&self) -> Result<Vec<UserSummary>> {
        let users = self.load().await?;
        Ok(users.iter().map(User::summary).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use crate::user::Theme;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn seeded_store() -> (UserStore, EventBus) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
        let events = EventBus::new();
        let store = UserStore::new(Arc::clone(&kv), Session::new(kv), events.clone());
        store.seed_defaults().await.unwrap();
        (store, events)
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (store, _) = seeded_store().await;
        assert!(!store.seed_defaults().await.unwrap());
        assert_eq!(store.all_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_seed_skipped_when_key_present() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKvStore::new());
        kv.set(keys::USERS, "[]".to_string()).await.unwrap();
        let store = UserStore::new(Arc::clone(&kv), Session::new(kv), EventBus::new());

        assert!(!store.seed_defaults().await.unwrap());
        assert!(store.all_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_with_seed_account() {
        let (store, _) = seeded_store().await;

        let user = store.login("Gnanesh", "Gnanesh").await.unwrap();
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            serde_json::json!({"id": 1, "username": "Gnanesh", "name": "Gnanesh"})
        );
        assert!(store.is_authenticated().await.unwrap());
        assert_eq!(store.current_user().await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password_and_case() {
        let (store, _) = seeded_store().await;

        let err = store.login("Gnanesh", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid username or password");

        // Login is case-sensitive even though uniqueness is not
        assert!(store.login("gnanesh", "Gnanesh").await.is_err());
        assert!(store.login("nobody", "nobody").await.is_err());
        assert!(!store.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn test_register_assigns_next_id_and_logs_in() {
        let (store, _) = seeded_store().await;

        let user = store
            .register(NewUser::new("alice", "secret", "Alice", "alice@example.com"))
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new(4));
        assert_eq!(store.current_user().await.unwrap(), Some(user.clone()));

        let details = store.get_user_details(user.id).await.unwrap().unwrap();
        assert_eq!(details.password, "secret");
        assert_eq!(details.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_case_insensitive() {
        let (store, _) = seeded_store().await;

        store
            .register(NewUser::new("Alice", "secret", "Alice", "alice@example.com"))
            .await
            .unwrap();
        let err = store
            .register(NewUser::new("ALICE", "secret", "Alice 2", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (store, _) = seeded_store().await;

        let err = store
            .register(NewUser::new("newbie", "secret", "New", "ASHIKA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
        assert_eq!(store.all_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (store, _) = seeded_store().await;
        store.login("Ashika", "Ashika").await.unwrap();

        store.logout().await.unwrap();
        store.logout().await.unwrap();
        assert!(store.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_session_user_notifies() {
        let (store, events) = seeded_store().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        events.subscribe_fn(move |notification| {
            if let Notification::ProfileUpdated(user) = notification {
                assert_eq!(user.theme, Some(Theme::Dark));
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.login("Gnanesh", "Gnanesh").await.unwrap();
        let updated = store
            .update_user(
                UserId::new(1),
                UserPatch {
                    name: Some("Gnanesh K".to_string()),
                    avatar_color: Some("#ef4444".to_string()),
                    theme: Some(Theme::Dark),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Gnanesh K");
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        let session = store.current_user().await.unwrap().unwrap();
        assert_eq!(session.name, "Gnanesh K");
        assert_eq!(session.avatar_color.as_deref(), Some("#ef4444"));
        assert_eq!(session.theme, Some(Theme::Dark));
    }

    #[tokio::test]
    async fn test_update_other_user_is_silent() {
        let (store, events) = seeded_store().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        events.subscribe_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.login("Gnanesh", "Gnanesh").await.unwrap();
        let updated = store
            .update_user(
                UserId::new(2),
                UserPatch {
                    name: Some("Ashika R".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ashika R");
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        let session = store.current_user().await.unwrap().unwrap();
        assert_eq!(session.id, UserId::new(1));
        assert_eq!(session.name, "Gnanesh");
    }

    #[tokio::test]
    async fn test_update_rejects_collisions_with_other_users() {
        let (store, _) = seeded_store().await;

        let err = store
            .update_user(
                UserId::new(1),
                UserPatch {
                    username: Some("ashika".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername));

        let err = store
            .update_user(
                UserId::new(1),
                UserPatch {
                    email: Some("Ashesh@Example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));

        // Keeping your own username is not a collision
        store
            .update_user(
                UserId::new(1),
                UserPatch {
                    username: Some("Gnanesh".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let (store, _) = seeded_store().await;
        let err = store
            .update_user(UserId::new(99), UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (store, _) = seeded_store().await;
        let id = UserId::new(3);

        let err = store.change_password(id, "wrong", "newpass").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg == "Current password is incorrect"));

        let err = store.change_password(id, "Ashesh", "ab").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        store.change_password(id, "Ashesh", "newpass").await.unwrap();
        assert!(store.login("Ashesh", "Ashesh").await.is_err());
        assert!(store.login("Ashesh", "newpass").await.is_ok());
    }

    #[tokio::test]
    async fn test_all_users_hides_passwords() {
        let (store, _) = seeded_store().await;
        let users = store.all_users().await.unwrap();
        let value = serde_json::to_value(&users).unwrap();
        for entry in value.as_array().unwrap() {
            assert!(entry.get("password").is_none());
            assert_eq!(entry["avatarColor"], "#6366f1");
        }
    }
}
