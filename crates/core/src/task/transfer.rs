//! Task import/export file format
//!
//! An export is a pretty-printed JSON array of tasks named
//! `tasks_export_<YYYY-MM-DD>.json`. An import accepts any JSON array of
//! task-like objects.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::model::{NewTask, Task};
use crate::{Error, Result};

/// A ready-to-download export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExport {
    pub file_name: String,
    pub contents: String,
}

impl TaskExport {
    pub fn new(tasks: &[Task], date: NaiveDate) -> Result<Self> {
        Ok(Self {
            file_name: export_file_name(date),
            contents: serde_json::to_string_pretty(tasks)?,
        })
    }

    /// Write the export into `dir`, returning the file path
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.contents).await?;
        Ok(path)
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("tasks_export_{}.json", date.format("%Y-%m-%d"))
}

/// Parse an import file.
///
/// Only the top level is checked: anything but a JSON array is rejected,
/// and every entry of an array becomes a task. Fields of the wrong shape
/// read as their defaults and entries that are not objects import as blank
/// tasks.
pub fn parse_import(contents: &str) -> Result<Vec<NewTask>> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|e| Error::InvalidFormat(format!("Invalid JSON: {}", e)))?;
    let Value::Array(entries) = value else {
        return Err(Error::InvalidFormat("Invalid file format".to_string()));
    };

    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value::<NewTask>(entry).unwrap_or_default())
        .collect())
}
