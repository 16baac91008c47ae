//! Calendar domain types: users, events, locations, categories, tasks and
//! per-user preferences.

mod category;
mod event;
mod location;
mod preference;
mod task;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use category::{Category, Subcategory};
pub use event::{Event, EventPatch, EventStatus, NewEvent};
pub use location::Location;
pub use preference::FocusPreference;
pub use task::{NewTask, Task, TaskStatus};

pub type UserId = i64;
pub type EventId = i64;
pub type TaskId = i64;
pub type SegmentId = i64;

/// Owner of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
