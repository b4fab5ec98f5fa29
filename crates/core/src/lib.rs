//! Core library for Taskdesk
//!
//! This crate contains the data-access layer behind the task manager UI:
//! - Key-value storage backends
//! - User accounts and the current session
//! - Task management, statistics and import/export
//! - Change notifications for views

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod id;
pub mod session;
pub mod storage;
pub mod task;
pub mod user;

pub use context::{AppContext, ContextOptions};
pub use error::Error;
pub use id::{TaskId, UserId};
pub type Result<T> = std::result::Result<T, Error>;
