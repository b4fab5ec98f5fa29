//! User model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;
use crate::{Error, Result};

/// Avatar color reported for users who never picked one
pub const DEFAULT_AVATAR_COLOR: &str = "#6366f1";

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

/// A stored user record, password included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn username_matches(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }

    /// Projection stored as the session pointer right after login or signup
    pub fn session_projection(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            avatar_color: None,
            theme: None,
        }
    }

    /// Projection including the profile customizations
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            avatar_color: self.avatar_color.clone(),
            theme: self.theme,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            avatar_color: self
                .avatar_color
                .clone()
                .unwrap_or_else(|| DEFAULT_AVATAR_COLOR.to_string()),
        }
    }

    /// Merge a patch into this record and stamp `updated_at`
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(avatar_color) = patch.avatar_color {
            self.avatar_color = Some(avatar_color);
        }
        if let Some(theme) = patch.theme {
            self.theme = Some(theme);
        }
        self.updated_at = Some(Utc::now());
    }
}

/// User data that is safe to show to other users or keep as the session pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// Entry of the assignee picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub avatar_color: String,
}

/// Signup candidate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Signup form checks, first failure wins
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return fail("Please enter your full name");
        }
        if self.email.trim().is_empty() {
            return fail("Please enter your email");
        }
        if !is_valid_email(&self.email) {
            return fail("Please enter a valid email address");
        }
        if self.username.trim().is_empty() {
            return fail("Please enter a username");
        }
        if self.username.chars().count() < 3 {
            return fail("Username must be at least 3 characters");
        }
        if self.password.trim().is_empty() {
            return fail("Please enter a password");
        }
        if self.password.chars().count() < 4 {
            return fail("Password must be at least 4 characters");
        }
        Ok(())
    }
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_color: Option<String>,
    #[serde(default)]
    pub theme: Option<Theme>,
}

fn fail(message: &str) -> Result<()> {
    Err(Error::InvalidInput(message.to_string()))
}

/// `local@domain.tld` with no whitespace and a single `@`
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let clean = |part: &str| {
        !part.is_empty() && !part.contains(|c: char| c.is_whitespace() || c == '@')
    };
    if !clean(local) || !clean(domain) {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Accounts written on first run
pub fn default_users(now: DateTime<Utc>) -> Vec<User> {
    ["Gnanesh", "Ashika", "Ashesh"]
        .iter()
        .enumerate()
        .map(|(index, name)| User {
            id: UserId::new(index as u64 + 1),
            username: name.to_string(),
            password: name.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            avatar_color: None,
            theme: None,
            created_at: now,
            updated_at: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        default_users(Utc::now()).remove(0)
    }

    #[test]
    fn test_default_users() {
        let users = default_users(Utc::now());
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].id, UserId::new(1));
        assert_eq!(users[0].username, "Gnanesh");
        assert_eq!(users[0].password, "Gnanesh");
        assert_eq!(users[2].email, "ashesh@example.com");
    }

    #[test]
    fn test_case_insensitive_matching() {
        let user = sample_user();
        assert!(user.username_matches("gnanesh"));
        assert!(user.email_matches("GNANESH@EXAMPLE.COM"));
        assert!(!user.username_matches("Ashika"));
    }

    #[test]
    fn test_projections_exclude_password() {
        let mut user = sample_user();
        user.avatar_color = Some("#22c55e".to_string());

        let value = serde_json::to_value(user.public()).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["avatarColor"], "#22c55e");

        let session = serde_json::to_value(user.session_projection()).unwrap();
        assert_eq!(
            session,
            serde_json::json!({"id": 1, "username": "Gnanesh", "name": "Gnanesh"})
        );
    }

    #[test]
    fn test_summary_defaults_avatar_color() {
        let summary = sample_user().summary();
        assert_eq!(summary.avatar_color, DEFAULT_AVATAR_COLOR);
    }

    #[test]
    fn test_apply_patch() {
        let mut user = sample_user();
        user.apply(UserPatch {
            name: Some("G. Nanesh".to_string()),
            theme: Some(Theme::Dark),
            ..Default::default()
        });
        assert_eq!(user.name, "G. Nanesh");
        assert_eq!(user.username, "Gnanesh");
        assert_eq!(user.theme, Some(Theme::Dark));
        assert!(user.updated_at.is_some());
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("a@com."));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("@b.com"));
    }

    #[test]
    fn test_signup_validation() {
        assert!(NewUser::new("alice", "secret", "Alice", "alice@example.com")
            .validate()
            .is_ok());

        let short_username = NewUser::new("al", "secret", "Alice", "alice@example.com");
        match short_username.validate() {
            Err(Error::InvalidInput(msg)) => {
                assert_eq!(msg, "Username must be at least 3 characters")
            }
            other => panic!("Expected InvalidInput, got: {:?}", other),
        }

        let short_password = NewUser::new("alice", "abc", "Alice", "alice@example.com");
        assert!(short_password.validate().is_err());

        let bad_email = NewUser::new("alice", "secret", "Alice", "alice");
        match bad_email.validate() {
            Err(Error::InvalidInput(msg)) => {
                assert_eq!(msg, "Please enter a valid email address")
            }
            other => panic!("Expected InvalidInput, got: {:?}", other),
        }
    }
}
