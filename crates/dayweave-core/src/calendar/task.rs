//! Backlog tasks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, TaskId, UserId};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// In the backlog, waiting for a slot.
    PendingCreation,
    /// Materialized into an event.
    Scheduled,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::PendingCreation => "PENDING_CREATION",
            TaskStatus::Scheduled => "SCHEDULED",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING_CREATION" => Ok(TaskStatus::PendingCreation),
            "SCHEDULED" => Ok(TaskStatus::Scheduled),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// An un-timed backlog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    /// Delegate, when the task was handed to someone else.
    pub assignee_id: Option<UserId>,
    pub name: String,
    pub estimated_minutes: i64,
    /// Higher is more urgent.
    pub priority: i32,
    pub status: TaskStatus,
    /// Event this task was materialized into.
    pub event_id: Option<EventId>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub user_id: UserId,
    pub name: String,
    pub estimated_minutes: i64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
}

impl NewTask {
    pub fn new(user_id: UserId, name: impl Into<String>, estimated_minutes: i64, priority: i32) -> Self {
        Self {
            user_id,
            name: name.into(),
            estimated_minutes,
            priority,
            assignee_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "task name cannot be blank"));
        }
        if self.estimated_minutes <= 0 {
            return Err(ValidationError::invalid(
                "estimated_minutes",
                format!("must be positive, got {}", self.estimated_minutes),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_must_be_positive() {
        assert!(NewTask::new(1, "Write report", 0, 3).validate().is_err());
        assert!(NewTask::new(1, "  ", 30, 3).validate().is_err());
        assert!(NewTask::new(1, "Write report", 30, 3).validate().is_ok());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [TaskStatus::PendingCreation, TaskStatus::Scheduled, TaskStatus::Done] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
    }
}
