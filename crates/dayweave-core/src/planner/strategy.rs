//! Backlog task selection for reshuffled windows.

use crate::calendar::{Event, EventId, Task, TaskId};

/// Chooses which backlog task fills a freed window.
///
/// `linked_event` resolves a task's `event_id` so strategies can look at
/// the state of the event a task was already materialized into.
pub trait TaskSelectionStrategy: Send + Sync {
    fn select_task(
        &self,
        tasks: &[Task],
        linked_event: &dyn Fn(EventId) -> Option<Event>,
        available_minutes: i64,
    ) -> Option<TaskId>;
}

/// Highest priority task that fits; ties go to the lowest task id.
///
/// A task is eligible when it is not done, fits the window, and its linked
/// event (if any) is neither cancelled nor already confirmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestPriorityFit;

impl HighestPriorityFit {
    fn eligible(task: &Task, linked_event: &dyn Fn(EventId) -> Option<Event>, available: i64) -> bool {
        if task.is_done() || task.estimated_minutes > available {
            return false;
        }
        match task.event_id.and_then(linked_event) {
            Some(event) => !event.status.is_cancelled() && !event.status.is_done(),
            None => true,
        }
    }
}

impl TaskSelectionStrategy for HighestPriorityFit {
    fn select_task(
        &self,
        tasks: &[Task],
        linked_event: &dyn Fn(EventId) -> Option<Event>,
        available_minutes: i64,
    ) -> Option<TaskId> {
        tasks
            .iter()
            .filter(|t| Self::eligible(t, linked_event, available_minutes))
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.id.cmp(&a.id)))
            .map(|t| t.id)
    }
}
