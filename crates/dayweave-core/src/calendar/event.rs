//! Calendar events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, EventId, Location, Subcategory, UserId};
use crate::error::ValidationError;
use crate::travel::TransportMode;

/// Lifecycle of an event.
///
/// Events are soft-terminated through `PendingDeletion`/`Cancelled` so that
/// travel segments never point at a missing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Planned,
    Confirmed,
    PendingDeletion,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Planned => "PLANNED",
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::PendingDeletion => "PENDING_DELETION",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    /// Cancelled events no longer occupy the timeline.
    pub fn is_cancelled(self) -> bool {
        matches!(self, EventStatus::Cancelled | EventStatus::PendingDeletion)
    }

    /// A confirmed event is treated as done when selecting backlog tasks.
    pub fn is_done(self) -> bool {
        matches!(self, EventStatus::Confirmed)
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Planned
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLANNED" => Ok(EventStatus::Planned),
            "CONFIRMED" => Ok(EventStatus::Confirmed),
            "PENDING_DELETION" => Ok(EventStatus::PendingDeletion),
            "CANCELLED" => Ok(EventStatus::Cancelled),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// A committed, timed entry on a user's calendar.
///
/// The interval is half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Stable identifier used when exporting the event.
    pub uid: String,
    pub user_id: UserId,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<Location>,
    pub status: EventStatus,
    pub category: Category,
    pub subcategory: Option<Subcategory>,
    pub transport_mode: Option<TransportMode>,
    /// Set on events created by a reshuffle: the cancelled event they replace.
    pub origin_event_id: Option<EventId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_cancelled()
    }

    pub fn is_located(&self) -> bool {
        self.location.is_some()
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Mode to use when travelling *to* this event, if it expresses one.
    pub fn preferred_mode(&self) -> Option<TransportMode> {
        self.transport_mode
    }
}

/// Fields needed to commit a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub user_id: UserId,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub subcategory: Option<Subcategory>,
    #[serde(default)]
    pub transport_mode: Option<TransportMode>,
}

impl NewEvent {
    pub fn new(
        user_id: UserId,
        summary: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            summary: summary.into(),
            start: start.trunc_subsecs(0),
            end: end.trunc_subsecs(0),
            location: None,
            category: Category::default(),
            subcategory: None,
            transport_mode: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_subcategory(mut self, subcategory: Subcategory) -> Self {
        self.category = subcategory.category();
        self.subcategory = Some(subcategory);
        self
    }

    pub fn with_transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = Some(mode);
        self
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Drop sub-second precision. Events are stored at whole seconds, so
    /// this is what validation and the stored row both see.
    pub fn whole_seconds(mut self) -> Self {
        self.start = self.start.trunc_subsecs(0);
        self.end = self.end.trunc_subsecs(0);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.summary,
            self.start,
            self.end,
            self.location.as_ref(),
            self.category,
            self.subcategory,
        )
    }
}

/// Partial update of an existing event. `None` leaves a field unchanged;
/// the nested options clear the field when set to `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<Option<Location>>,
    pub category: Option<Category>,
    pub subcategory: Option<Option<Subcategory>>,
    pub transport_mode: Option<Option<TransportMode>>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self == &EventPatch::default()
    }

    /// Apply the patch to a copy of `event` and validate the result.
    pub fn apply(&self, event: &Event) -> Result<Event, ValidationError> {
        let mut next = event.clone();
        if let Some(summary) = &self.summary {
            next.summary = summary.clone();
        }
        if let Some(start) = self.start {
            next.start = start.trunc_subsecs(0);
        }
        if let Some(end) = self.end {
            next.end = end.trunc_subsecs(0);
        }
        if let Some(location) = &self.location {
            next.location = location.clone();
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(subcategory) = self.subcategory {
            next.subcategory = subcategory;
        }
        if let Some(mode) = self.transport_mode {
            next.transport_mode = mode;
        }
        validate_fields(
            &next.summary,
            next.start,
            next.end,
            next.location.as_ref(),
            next.category,
            next.subcategory,
        )?;
        Ok(next)
    }
}

fn validate_fields(
    summary: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    location: Option<&Location>,
    category: Category,
    subcategory: Option<Subcategory>,
) -> Result<(), ValidationError> {
    if summary.trim().is_empty() {
        return Err(ValidationError::invalid("summary", "summary cannot be blank"));
    }
    if end <= start {
        return Err(ValidationError::InvalidTimeRange { start, end });
    }
    if let Some(location) = location {
        location.validate()?;
    }
    if let Some(sub) = subcategory {
        if sub.category() != category {
            return Err(ValidationError::invalid(
                "subcategory",
                format!("{sub} belongs to {}, not {category}", sub.category()),
            ));
        }
    }
    Ok(())
}
