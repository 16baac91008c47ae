//! Event, task and user intake.

use serde::{Deserialize, Serialize};

use super::Planner;
use crate::calendar::{
    Event, EventId, EventPatch, EventStatus, FocusPreference, NewEvent, NewTask, Task, TaskId,
    TaskStatus, User, UserId,
};
use crate::error::{Conflict, CoreError, Result, ValidationError};
use crate::timeline::{ensure_user, local_date};
use crate::travel::resolver;

/// Outcome of a batch import. Rejections are per event, never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: Vec<Event>,
    pub rejected: Vec<ImportRejection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRejection {
    /// Position in the submitted batch.
    pub index: usize,
    pub summary: String,
    pub reason: String,
}

impl Planner {
    // === Users ===

    pub fn create_user(&self, name: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "user name cannot be blank").into());
        }
        let user = self.store.insert_user(name.trim())?;
        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.store.list_users()
    }

    /// The user's stored overrides, empty when none were ever set.
    pub fn preference(&self, user_id: UserId) -> Result<FocusPreference> {
        ensure_user(self.store(), user_id)?;
        self.stored_preference(user_id)
    }

    /// Replace the user's overrides. Takes effect on the next budget check
    /// or focus search; existing events are not re-validated.
    pub fn set_preference(&self, preference: FocusPreference) -> Result<FocusPreference> {
        preference.validate()?;
        ensure_user(self.store(), preference.user_id)?;
        self.locks.with_user(preference.user_id, || {
            let stored = self.store.upsert_preference(&preference)?;
            tracing::info!(user_id = stored.user_id, ?stored, "preference updated");
            Ok(stored)
        })
    }

    // === Events ===

    /// Validate and commit a new event, then refresh the user's travel segments.
    pub fn create_event(&self, event: NewEvent) -> Result<Event> {
        let event = event.whole_seconds();
        event.validate()?;
        ensure_user(self.store(), event.user_id)?;
        self.locks.with_user(event.user_id, || {
            let created = self.admit_event(&event)?;
            self.refresh_segments(event.user_id);
            Ok(created)
        })
    }

    /// Checks and insert for one event. Caller holds the user's lock.
    fn admit_event(&self, event: &NewEvent) -> Result<Event> {
        self.check_overload(event.user_id, event.start, None)?;
        self.check_overlap(event.user_id, event.start, event.end, None)?;
        self.check_travel(&self.probe_event(event))?;

        let created = self.store.insert_event(event, None)?;
        tracing::info!(
            user_id = created.user_id,
            event_id = created.id,
            start = %created.start,
            "event created"
        );
        Ok(created)
    }

    pub fn update_event(&self, id: EventId, patch: EventPatch) -> Result<Event> {
        let owner = self.load_event(id)?.user_id;
        self.locks.with_user(owner, || {
            let current = self.load_event(id)?;
            if current.status.is_cancelled() {
                return Err(ValidationError::invalid(
                    "status",
                    format!("event {id} is {} and cannot be edited", current.status),
                )
                .into());
            }
            if patch.is_empty() {
                return Ok(current);
            }
            let next = patch.apply(&current)?;

            if local_date(self.tz, next.start) != local_date(self.tz, current.start) {
                self.check_overload(owner, next.start, Some(id))?;
            }
            self.check_overlap(owner, next.start, next.end, Some(id))?;
            self.check_travel(&next)?;

            let updated = self.store.update_event(&next)?;
            tracing::info!(user_id = owner, event_id = id, "event updated");
            self.refresh_segments(owner);
            Ok(updated)
        })
    }

    /// Soft-cancel an event. Cancelling twice is a no-op.
    pub fn cancel_event(&self, id: EventId) -> Result<Event> {
        let owner = self.load_event(id)?.user_id;
        self.locks.with_user(owner, || {
            let current = self.load_event(id)?;
            if current.status.is_cancelled() {
                return Ok(current);
            }
            self.store.set_event_status(id, EventStatus::Cancelled)?;
            tracing::info!(user_id = owner, event_id = id, "event cancelled");
            self.refresh_segments(owner);
            self.load_event(id)
        })
    }

    /// Mark an event as confirmed (attended).
    pub fn confirm_event(&self, id: EventId) -> Result<Event> {
        let owner = self.load_event(id)?.user_id;
        self.locks.with_user(owner, || {
            let current = self.load_event(id)?;
            if current.status.is_cancelled() {
                return Err(ValidationError::invalid(
                    "status",
                    format!("event {id} is {} and cannot be confirmed", current.status),
                )
                .into());
            }
            self.store.set_event_status(id, EventStatus::Confirmed)?;
            self.load_event(id)
        })
    }

    /// Admit proposed events one by one through the same rules as
    /// [`Planner::create_event`]. Segments are refreshed once at the end.
    pub fn import_events(&self, user_id: UserId, events: Vec<NewEvent>) -> Result<ImportReport> {
        ensure_user(self.store(), user_id)?;
        self.locks.with_user(user_id, || {
            let mut report = ImportReport::default();
            for (index, event) in events.into_iter().enumerate() {
                let mut event = event.whole_seconds();
                event.user_id = user_id;
                let outcome = event
                    .validate()
                    .map_err(CoreError::from)
                    .and_then(|()| self.admit_event(&event));
                match outcome {
                    Ok(created) => report.created.push(created),
                    Err(e @ CoreError::Database(_)) => return Err(e),
                    Err(e) => {
                        tracing::debug!(index, error = %e, "import rejected event");
                        report.rejected.push(ImportRejection {
                            index,
                            summary: event.summary.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            if !report.created.is_empty() {
                self.refresh_segments(user_id);
            }
            tracing::info!(
                user_id,
                created = report.created.len(),
                rejected = report.rejected.len(),
                "import finished"
            );
            Ok(report)
        })
    }

    /// Fail when `[start, end)` intersects a non-cancelled event other than `exclude`.
    pub(super) fn check_overlap(
        &self,
        user_id: UserId,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
        exclude: Option<EventId>,
    ) -> Result<()> {
        let clash = self
            .events_in_window(user_id, start, end)?
            .into_iter()
            .find(|e| Some(e.id) != exclude);
        match clash {
            Some(e) => Err(CoreError::SchedulingConflict(Conflict::Overlap {
                event_id: e.id,
                start: e.start,
                end: e.end,
            })),
            None => Ok(()),
        }
    }

    /// Fail when `event` cannot be reached in time, or when leaving it would
    /// make the next located event unreachable.
    ///
    /// An explicit transport mode is checked against the previous located
    /// event. Otherwise the neighbours recalculation would pair it with are
    /// checked using the mode recalculation would pick.
    fn check_travel(&self, event: &Event) -> Result<()> {
        if !event.is_located() {
            return Ok(());
        }
        let mut others: Vec<Event> = self
            .store
            .events_for_user(event.user_id, false)?
            .into_iter()
            .filter(|e| e.id != event.id)
            .collect();
        others.sort_by_key(|e| (e.start, e.id));

        let calculator = self.calculator(self.config.reconcile.use_network);
        let default_mode = self.config.travel.default_mode;
        let before = others.iter().rev().find(|e| e.end <= event.start);
        let after = others.iter().find(|e| e.start >= event.end);

        match event.transport_mode {
            Some(mode) => {
                let previous = others
                    .iter()
                    .filter(|e| e.is_located() && e.end <= event.start)
                    .max_by_key(|e| (e.end, e.id));
                if let Some(previous) = previous {
                    resolver::resolve(calculator, previous, event, mode)?;
                }
            }
            None => {
                if let Some(previous) = before.filter(|e| e.is_located()) {
                    let mode = resolver::choose_mode(event, None, default_mode);
                    resolver::resolve(calculator, previous, event, mode)?;
                }
            }
        }
        if let Some(next) = after.filter(|e| e.is_located()) {
            let mode = resolver::choose_mode(next, None, default_mode);
            resolver::resolve(calculator, event, next, mode)?;
        }
        Ok(())
    }

    /// Unsaved stand-in used to run event-level checks before insert.
    fn probe_event(&self, event: &NewEvent) -> Event {
        let now = chrono::Utc::now();
        Event {
            id: 0,
            uid: String::new(),
            user_id: event.user_id,
            summary: event.summary.clone(),
            start: event.start,
            end: event.end,
            location: event.location.clone(),
            status: EventStatus::Planned,
            category: event.category,
            subcategory: event.subcategory,
            transport_mode: event.transport_mode,
            origin_event_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    // === Tasks ===

    pub fn create_task(&self, task: NewTask) -> Result<Task> {
        task.validate()?;
        ensure_user(self.store(), task.user_id)?;
        if let Some(assignee) = task.assignee_id {
            ensure_user(self.store(), assignee)?;
        }
        let created = self.store.insert_task(&task)?;
        tracing::info!(user_id = created.user_id, task_id = created.id, "task created");
        Ok(created)
    }

    pub fn list_tasks(&self, user_id: UserId) -> Result<Vec<Task>> {
        ensure_user(self.store(), user_id)?;
        self.store.tasks_for_user(user_id)
    }

    pub fn complete_task(&self, id: TaskId) -> Result<Task> {
        let task = self
            .store
            .get_task(id)?
            .ok_or_else(|| CoreError::not_found("task", id))?;
        self.locks.with_user(task.user_id, || {
            let mut task = self
                .store
                .get_task(id)?
                .ok_or_else(|| CoreError::not_found("task", id))?;
            task.status = TaskStatus::Done;
            self.store.update_task(&task)?;
            Ok(task)
        })
    }
}
