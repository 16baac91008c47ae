//! Turning a cancelled event's freed window into a backlog task.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Planner;
use crate::calendar::{Category, Event, EventId, EventStatus, NewEvent, TaskId};
use crate::error::{CoreError, Result};

/// What a reshuffle run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReshuffleOutcome {
    /// A task was scheduled into the freed window and the original cancelled.
    Materialized {
        original_event_id: EventId,
        event: Event,
        task_id: TaskId,
    },
    /// Nothing fit; the original was cancelled.
    NoEligibleTask { original_event_id: EventId },
    /// An earlier run already materialized a replacement.
    Reconciled {
        original_event_id: EventId,
        event: Event,
    },
}

impl ReshuffleOutcome {
    /// The replacement event, when one exists.
    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::Materialized { event, .. } | Self::Reconciled { event, .. } => Some(event),
            Self::NoEligibleTask { .. } => None,
        }
    }
}

impl Planner {
    /// Cancel `event_id` and fill its window with the best fitting task.
    ///
    /// Works on events that are already cancelled too. Fails with a
    /// scheduling conflict when another event now occupies the window.
    ///
    /// Safe to retry: a second run after success reconciles against the
    /// event the first one created instead of materializing another.
    pub fn reshuffle(&self, event_id: EventId) -> Result<ReshuffleOutcome> {
        let owner = self.load_event(event_id)?.user_id;
        self.locks.with_user(owner, || self.reshuffle_locked(event_id))
    }

    fn reshuffle_locked(&self, event_id: EventId) -> Result<ReshuffleOutcome> {
        let original = self.load_event(event_id)?;

        if let Some(existing) = self.store.find_by_origin(event_id)? {
            if !original.status.is_cancelled() {
                self.store.set_event_status(event_id, EventStatus::Cancelled)?;
                self.refresh_segments(original.user_id);
            }
            tracing::info!(event_id, replacement_id = existing.id, "reshuffle already applied");
            return Ok(ReshuffleOutcome::Reconciled {
                original_event_id: event_id,
                event: existing,
            });
        }
        let free_minutes = original.duration_minutes();
        let tasks = self.store.tasks_for_user(original.user_id)?;
        let events: HashMap<EventId, Event> = self
            .store
            .events_for_user(original.user_id, true)?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let lookup = |id: EventId| events.get(&id).cloned();
        let selected = self.strategy.select_task(&tasks, &lookup, free_minutes);
        tracing::debug!(event_id, free_minutes, candidates = tasks.len(), ?selected, "task selection");

        let Some(task) = selected.and_then(|id| tasks.iter().find(|t| t.id == id)) else {
            self.store.commit_reshuffle(event_id, None)?;
            tracing::info!(event_id, "reshuffle cancelled event, no eligible task");
            self.refresh_segments(original.user_id);
            return Ok(ReshuffleOutcome::NoEligibleTask {
                original_event_id: event_id,
            });
        };

        let replacement = NewEvent::new(
            original.user_id,
            task.name.clone(),
            original.start,
            original.start + chrono::Duration::minutes(task.estimated_minutes),
        )
        .with_category(Category::Work);
        // The window may have been taken since the original was cancelled.
        self.check_overlap(original.user_id, replacement.start, replacement.end, Some(event_id))?;
        let event = self
            .store
            .commit_reshuffle(event_id, Some((&replacement, task.id)))?
            .ok_or_else(|| CoreError::not_found("event", event_id))?;

        tracing::info!(
            event_id,
            replacement_id = event.id,
            task_id = task.id,
            "reshuffle materialized task"
        );
        self.refresh_segments(original.user_id);
        Ok(ReshuffleOutcome::Materialized {
            original_event_id: event_id,
            event,
            task_id: task.id,
        })
    }
}
