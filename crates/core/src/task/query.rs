//! Task list filtering, search and sorting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::model::{Task, TaskStatus};
use crate::id::UserId;

/// Filter tab of the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
    Overdue,
    /// Assigned to the user by someone else
    Assigned,
    /// Created by the user
    Created,
}

impl TaskFilter {
    pub fn matches(self, task: &Task, user: UserId, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::Active => task.status == TaskStatus::Active,
            Self::Completed => task.is_completed(),
            Self::Overdue => task.is_overdue(now),
            Self::Assigned => {
                task.assigned_to == Some(user) && task.created_by != Some(user)
            }
            Self::Created => task.created_by == Some(user),
        }
    }
}

/// Sort order of the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSort {
    /// Earliest due date first, undated tasks last
    #[default]
    DueDate,
    /// High, medium, low
    Priority,
    /// Newest first
    Created,
}

impl TaskSort {
    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            Self::DueDate => match (a.due_date, b.due_date) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            Self::Priority => a.priority.rank().cmp(&b.priority.rank()),
            Self::Created => b.created_at.cmp(&a.created_at),
        }
    }
}

/// What the task list shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(default)]
    pub filter: TaskFilter,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: TaskSort,
}

impl TaskQuery {
    /// Case-insensitive substring match on title, description and tags
    fn matches_search(&self, task: &Task) -> bool {
        let Some(search) = self.search.as_deref().map(str::trim) else {
            return true;
        };
        if search.is_empty() {
            return true;
        }
        let needle = search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
            || task
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }

    /// Filter, search and sort `tasks` from the point of view of `user`
    pub fn apply(&self, tasks: Vec<Task>, user: UserId, now: DateTime<Utc>) -> Vec<Task> {
        let mut selected: Vec<Task> = tasks
            .into_iter()
            .filter(|task| self.filter.matches(task, user, now))
            .filter(|task| self.matches_search(task))
            .collect();
        selected.sort_by(|a, b| self.sort.compare(a, b));
        selected
    }
}

/// Badge counts shown on each filter tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCounts {
    pub all: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
    pub assigned: usize,
    pub created: usize,
}

impl FilterCounts {
    pub fn compute(tasks: &[Task], user: UserId, now: DateTime<Utc>) -> Self {
        let count = |filter: TaskFilter| {
            tasks
                .iter()
                .filter(|task| filter.matches(task, user, now))
                .count()
        };
        Self {
            all: count(TaskFilter::All),
            active: count(TaskFilter::Active),
            completed: count(TaskFilter::Completed),
            overdue: count(TaskFilter::Overdue),
            assigned: count(TaskFilter::Assigned),
            created: count(TaskFilter::Created),
        }
    }
}
