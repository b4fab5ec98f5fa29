//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Message shown to the user for this failure.
    ///
    /// Not-found errors collapse to a generic message so record ids never
    /// leak into the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::UserNotFound(_) => "User not found".to_string(),
            Self::TaskNotFound(_) => "Task not found".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(Error::DuplicateUsername.to_string(), "Username already exists");
        assert_eq!(Error::DuplicateEmail.to_string(), "Email already exists");
        assert_eq!(
            Error::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
        assert_eq!(
            Error::InvalidFormat("Invalid file format".to_string()).to_string(),
            "Invalid file format"
        );
    }

    #[test]
    fn test_not_found_hides_id() {
        let err = Error::UserNotFound("42".to_string());
        assert_eq!(err.user_message(), "User not found");
        assert!(err.to_string().contains("42"));
    }
}
