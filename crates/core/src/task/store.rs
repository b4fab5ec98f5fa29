//! Task store
//!
//! Owns the `tasks` collection. Every mutation reads the whole collection,
//! changes a private copy, writes it back and then publishes
//! `TasksUpdated`.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::model::{NewTask, Task, TaskPatch};
use super::query::{FilterCounts, TaskQuery};
use super::stats::TaskStats;
use super::transfer::{self, TaskExport};
use crate::events::{EventBus, Notification};
use crate::id::{TaskId, UserId};
use crate::storage::{self, keys, KeyValueStore};
use crate::{Error, Result};

#[derive(Clone)]
pub struct TaskStore {
    kv: Arc<dyn KeyValueStore>,
    events: EventBus,
    /// Serializes read-modify-write cycles within this process
    write_lock: Arc<Mutex<()>>,
}

impl TaskStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, events: EventBus) -> Self {
        Self {
            kv,
            events,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write an empty collection if none has ever been stored
    pub async fn seed_defaults(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.kv.get(keys::TASKS).await?.is_some() {
            return Ok(false);
        }
        self.save(&[]).await?;
        Ok(true)
    }

    /// Read the collection. Entries that are not task objects are skipped;
    /// fields of the wrong shape read as their defaults.
    async fn load(&self) -> Result<Vec<Task>> {
        let entries: Option<Vec<Value>> =
            storage::read_json(self.kv.as_ref(), keys::TASKS).await?;
        let tasks = entries
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Task>(entry) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(index, error = %e, "skipping unreadable stored task");
                    None
                }
            })
            .collect();
        Ok(tasks)
    }

    async fn save(&self, tasks: &[Task]) -> Result<()> {
        storage::write_json(self.kv.as_ref(), keys::TASKS, tasks).await
    }

    async fn save_and_notify(&self, tasks: &[Task]) -> Result<()> {
        self.save(tasks).await?;
        self.events.publish(Notification::TasksUpdated);
        Ok(())
    }

    /// Every stored task
    pub async fn all_tasks(&self) -> Result<Vec<Task>> {
        self.load().await
    }

    /// Tasks the user created or is assigned to
    pub async fn user_tasks(&self, user: UserId) -> Result<Vec<Task>> {
        let tasks = self.load().await?;
        let mine: Vec<Task> = tasks.into_iter().filter(|t| t.involves(user)).collect();
        debug!(user_id = %user, count = mine.len(), "loaded user tasks");
        Ok(mine)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>> {
        let tasks = self.load().await?;
        Ok(tasks.into_iter().find(|t| &t.id == id))
    }

    pub async fn create_task(&self, data: NewTask) -> Result<Task> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await?;

        let task = Task::from_new(data, TaskId::generate(), Utc::now());
        tasks.push(task.clone());
        self.save_and_notify(&tasks).await?;

        debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Merge `patch` into a task. `Ok(None)` if no task has that id.
    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Option<Task>> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await?;

        let Some(task) = tasks.iter_mut().find(|t| &t.id == id) else {
            debug!(task_id = %id, "update skipped, no such task");
            return Ok(None);
        };
        task.apply(patch, Utc::now());
        let updated = task.clone();

        self.save_and_notify(&tasks).await?;
        Ok(Some(updated))
    }

    /// Remove a task. Absent ids are not an error; returns whether one was removed.
    pub async fn delete_task(&self, id: &TaskId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await?;

        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        let removed = tasks.len() != before;

        self.save_and_notify(&tasks).await?;
        debug!(task_id = %id, removed, "task delete");
        Ok(removed)
    }

    pub async fn task_stats(&self, user: UserId) -> Result<TaskStats> {
        self.task_stats_at(user, Utc::now()).await
    }

    /// Statistics evaluated against a fixed instant
    pub async fn task_stats_at(&self, user: UserId, now: DateTime<Utc>) -> Result<TaskStats> {
        let tasks = self.user_tasks(user).await?;
        Ok(TaskStats::compute(&tasks, now))
    }

    /// Filtered, searched and sorted view of the user's tasks
    pub async fn query_tasks(&self, user: UserId, query: &TaskQuery) -> Result<Vec<Task>> {
        let tasks = self.user_tasks(user).await?;
        Ok(query.apply(tasks, user, Utc::now()))
    }

    pub async fn filter_counts(&self, user: UserId) -> Result<FilterCounts> {
        let tasks = self.user_tasks(user).await?;
        Ok(FilterCounts::compute(&tasks, user, Utc::now()))
    }

    /// Serialize the user's tasks into a dated export. Does not touch storage.
    pub async fn export_tasks(&self, user: UserId) -> Result<TaskExport> {
        let tasks = self.user_tasks(user).await?;
        let export = TaskExport::new(&tasks, Utc::now().date_naive())?;
        info!(user_id = %user, count = tasks.len(), file = %export.file_name, "tasks exported");
        Ok(export)
    }

    /// Append every task in `contents` as a new task created by `user`.
    ///
    /// Parsing happens before anything is written, so a bad file leaves the
    /// collection untouched. Returns the number of tasks imported.
    pub async fn import_tasks(&self, contents: &str, user: UserId) -> Result<usize> {
        let entries = transfer::parse_import(contents)?;

        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await?;
        let now = Utc::now();
        let count = entries.len();
        tasks.extend(entries.into_iter().map(|mut data| {
            data.created_by = Some(user);
            Task::from_new(data, TaskId::generate(), now)
        }));
        self.save_and_notify(&tasks).await?;

        info!(user_id = %user, count, "tasks imported");
        Ok(count)
    }

    /// Read an import file from disk and import it
    pub async fn import_file(&self, path: impl AsRef<Path>, user: UserId) -> Result<usize> {
        let contents = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|_| Error::InvalidFormat("Failed to read file".to_string()))?;
        self.import_tasks(&contents, user).await
    }

    /// Remove the user's completed tasks; returns how many were removed
    pub async fn clear_completed_tasks(&self, user: UserId) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load().await?;

        let before = tasks.len();
        tasks.retain(|t| !(t.is_completed() && t.involves(user)));
        let removed = before - tasks.len();

        self.save_and_notify(&tasks).await?;
        info!(user_id = %user, removed, "completed tasks cleared");
        Ok(removed)
    }
}
