//! Task module
//!
//! This module contains task-related types and logic.

mod model;
mod query;
mod stats;
mod store;
mod transfer;

pub use model::*;
pub use query::{FilterCounts, TaskFilter, TaskQuery, TaskSort};
pub use stats::TaskStats;
pub use store::TaskStore;
pub use transfer::{export_file_name, parse_import, TaskExport};
