//! Per-user task statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::model::{Task, TaskStatus};

/// Derived summary over a user's tasks; never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    /// Same value as `active`; there is no separate pending state
    pub pending: usize,
    pub completed: usize,
    /// Percentage of completed tasks, rounded; 0 with no tasks
    pub completion_rate: u32,
    pub overdue: usize,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let total = tasks.len();
        let active = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Active)
            .count();
        let completed = tasks.iter().filter(|t| t.is_completed()).count();
        let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count();

        Self {
            total,
            active,
            pending: active,
            completed,
            completion_rate: completion_rate(completed, total),
            overdue,
        }
    }
}

fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    // Round half up in integers: floor((200c + t) / 2t)
    ((200 * completed + total) / (2 * total)) as u32
}
