//! Task model definitions

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::id::{TaskId, UserId};
use crate::{Error, Result};

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "pending")]
    Active,
    Completed,
}

/// Task priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    /// Sort rank, most urgent first
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

pub const DEFAULT_CATEGORY: &str = "personal";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "TaskId::generate", deserialize_with = "lenient_task_id")]
    pub id: TaskId,
    #[serde(default, deserialize_with = "or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "or_default")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "or_default")]
    pub priority: TaskPriority,
    #[serde(default = "default_category", deserialize_with = "lenient_category")]
    pub category: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_date"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_user_id"
    )]
    pub assigned_to: Option<UserId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_user_id"
    )]
    pub created_by: Option<UserId>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub notes: String,
    /// Unreadable or missing timestamps fall back to the Unix epoch
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a stored task from caller data, a fresh id and a timestamp
    pub fn from_new(data: NewTask, id: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            category: data.category,
            due_date: data.due_date,
            assigned_to: data.assigned_to,
            created_by: data.created_by,
            tags: normalize_tags(data.tags),
            notes: data.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Created by or assigned to `user`
    pub fn involves(&self, user: UserId) -> bool {
        self.created_by == Some(user) || self.assigned_to == Some(user)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Not completed and due strictly before `now`.
    ///
    /// A due date counts from midnight UTC of that day.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        if self.is_completed() {
            return false;
        }
        self.due_date
            .is_some_and(|due| due.and_time(NaiveTime::MIN).and_utc() < now)
    }

    /// Merge a patch and re-stamp `updated_at`
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(created_by) = patch.created_by {
            self.created_by = Some(created_by);
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.updated_at = now;
    }
}

/// Caller-supplied task data.
///
/// Also the shape accepted for each entry of an import file, so every field
/// is optional on the wire and a value of the wrong shape reads as the
/// field's default. Ids and timestamps in the input are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default, deserialize_with = "or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "or_default")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "or_default")]
    pub priority: TaskPriority,
    #[serde(default = "default_category", deserialize_with = "lenient_category")]
    pub category: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_date"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_user_id"
    )]
    pub assigned_to: Option<UserId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_user_id"
    )]
    pub created_by: Option<UserId>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub notes: String,
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            category: default_category(),
            due_date: None,
            assigned_to: None,
            created_by: None,
            tags: Vec::new(),
            notes: String::new(),
        }
    }
}

impl NewTask {
    /// Create task data with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Set the creator
    pub fn created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    /// Set the assignee
    pub fn assigned_to(mut self, user: UserId) -> Self {
        self.assigned_to = Some(user);
        self
    }

    /// Set the tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Task form checks, first failure wins
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Task title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::InvalidInput("Description is required".to_string()));
        }
        if self.due_date.is_none() {
            return Err(Error::InvalidInput("Due date is required".to_string()));
        }
        Ok(())
    }
}

/// Partial task update; absent fields are left untouched, an explicit
/// `null` clears the due date or assignee
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub category: Option<String>,
    /// `Some(None)` clears the due date
    #[serde(default, deserialize_with = "clearable_date")]
    pub due_date: Option<Option<NaiveDate>>,
    /// `Some(None)` unassigns the task
    #[serde(default, deserialize_with = "clearable_user_id")]
    pub assigned_to: Option<Option<UserId>>,
    #[serde(default, deserialize_with = "lenient_user_id")]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Trim tags, drop empty ones and keep the first occurrence of duplicates
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|existing| existing == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

fn date_from_value(raw: Option<Value>) -> Option<NaiveDate> {
    let Some(Value::String(text)) = raw else {
        return None;
    };
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
}

fn user_id_from_value(raw: Option<Value>) -> Option<UserId> {
    match raw {
        Some(Value::Number(number)) => number.as_u64().map(UserId::new),
        Some(Value::String(text)) => text.parse().ok(),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, a full RFC 3339 timestamp, empty strings and null
fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(date_from_value(Option::<Value>::deserialize(deserializer)?))
}

/// Accepts numeric ids as numbers or strings; anything else means unassigned
fn lenient_user_id<'de, D>(deserializer: D) -> std::result::Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(user_id_from_value(Option::<Value>::deserialize(deserializer)?))
}

/// Present in a patch: `null` or an unreadable date clears the field
fn clearable_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(date_from_value(Option::<Value>::deserialize(deserializer)?)))
}

fn clearable_user_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<UserId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(user_id_from_value(Option::<Value>::deserialize(deserializer)?)))
}

/// Any value that does not fit `T` (null, wrong type, unknown variant)
/// reads as `T::default()`
fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

fn lenient_category<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(category) => category,
        _ => default_category(),
    })
}

/// Keeps the string entries of an array; anything else is no tags
fn lenient_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(tag) => Some(tag),
            _ => None,
        })
        .collect())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = match Value::deserialize(deserializer)? {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|timestamp| timestamp.with_timezone(&Utc)),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };
    Ok(timestamp.unwrap_or_default())
}

/// Task ids are strings; older records may carry a bare number
fn lenient_task_id<'de, D>(deserializer: D) -> std::result::Result<TaskId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) if !id.is_empty() => TaskId::from(id),
        Value::Number(number) => TaskId::from(number.to_string()),
        _ => TaskId::generate(),
    })
}
