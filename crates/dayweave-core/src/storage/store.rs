//! Persistence boundary for the engine.

use chrono::{DateTime, Utc};

use crate::calendar::{
    Event, EventId, EventStatus, FocusPreference, NewEvent, NewTask, Task, TaskId, User, UserId,
};
use crate::error::Result;
use crate::travel::{SegmentPlan, TravelTime};

/// Everything the planner reads and writes.
///
/// Implementations must make `apply_segment_plan` and `commit_reshuffle`
/// atomic: either every write lands or none does. Event lists are ordered
/// by start, then id.
pub trait CalendarStore: Send + Sync {
    fn insert_user(&self, name: &str) -> Result<User>;
    fn get_user(&self, id: UserId) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn get_preference(&self, user_id: UserId) -> Result<Option<FocusPreference>>;
    /// Insert or replace the user's preference row.
    fn upsert_preference(&self, preference: &FocusPreference) -> Result<FocusPreference>;

    /// `origin_event_id` is set only for reshuffle materializations.
    fn insert_event(&self, event: &NewEvent, origin_event_id: Option<EventId>) -> Result<Event>;
    /// Overwrite every mutable column of an existing event.
    fn update_event(&self, event: &Event) -> Result<Event>;
    fn get_event(&self, id: EventId) -> Result<Option<Event>>;
    fn events_for_user(&self, user_id: UserId, include_cancelled: bool) -> Result<Vec<Event>>;
    /// Events of any status intersecting `[start, end)`.
    fn events_overlapping(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>>;
    fn find_by_origin(&self, origin_event_id: EventId) -> Result<Option<Event>>;
    fn set_event_status(&self, id: EventId, status: EventStatus) -> Result<()>;

    fn get_segment(&self, from_event_id: EventId, to_event_id: EventId) -> Result<Option<TravelTime>>;
    fn segments_for_user(&self, user_id: UserId) -> Result<Vec<TravelTime>>;
    fn segments_overlapping(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TravelTime>>;
    /// Insert or replace the segment for its `(from, to)` pair.
    fn upsert_segment(&self, segment: &TravelTime) -> Result<TravelTime>;
    fn apply_segment_plan(&self, plan: &SegmentPlan) -> Result<()>;

    fn insert_task(&self, task: &NewTask) -> Result<Task>;
    fn get_task(&self, id: TaskId) -> Result<Option<Task>>;
    fn tasks_for_user(&self, user_id: UserId) -> Result<Vec<Task>>;
    fn update_task(&self, task: &Task) -> Result<()>;

    /// Insert `replacement` linked to `original_id`, point `task_id` at it
    /// with status `SCHEDULED`, and cancel the original, atomically.
    /// Without a task only the cancellation is written.
    fn commit_reshuffle(
        &self,
        original_id: EventId,
        replacement: Option<(&NewEvent, TaskId)>,
    ) -> Result<Option<Event>>;
}
