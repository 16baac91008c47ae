//! Read-only views of a user's committed timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{Event, UserId};
use crate::error::{CoreError, Result};
use crate::storage::CalendarStore;

/// Retention policy for cancelled events in a window query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineFilter {
    /// Include cancelled events ending at or after this instant.
    pub include_cancelled_since: Option<DateTime<Utc>>,
}

impl TimelineFilter {
    pub fn active_only() -> Self {
        Self::default()
    }

    pub fn with_cancelled_since(since: DateTime<Utc>) -> Self {
        Self {
            include_cancelled_since: Some(since),
        }
    }

    fn admits(&self, event: &Event) -> bool {
        if event.is_active() {
            return true;
        }
        matches!(self.include_cancelled_since, Some(cutoff) if event.end >= cutoff)
    }
}

pub(crate) fn ensure_user(store: &dyn CalendarStore, user_id: UserId) -> Result<()> {
    match store.get_user(user_id)? {
        Some(_) => Ok(()),
        None => Err(CoreError::not_found("user", user_id)),
    }
}

/// Events intersecting `[start, end)`, ascending by start then id.
pub fn events_in_window(
    store: &dyn CalendarStore,
    user_id: UserId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter: TimelineFilter,
) -> Result<Vec<Event>> {
    ensure_user(store, user_id)?;
    let mut events: Vec<Event> = store
        .events_overlapping(user_id, start, end)?
        .into_iter()
        .filter(|e| filter.admits(e))
        .collect();
    events.sort_by_key(|e| (e.start, e.id));
    Ok(events)
}
