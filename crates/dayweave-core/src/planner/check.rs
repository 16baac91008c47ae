//! Timeline consistency audit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Planner;
use crate::calendar::{Event, EventId, SegmentId, UserId};
use crate::error::Result;
use crate::timeline::ensure_user;

/// A broken timeline invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Two non-cancelled events intersect.
    Overlap { first: EventId, second: EventId },
    /// Segment does not start when its origin event ends.
    SegmentMisaligned {
        segment_id: SegmentId,
        expected_start: DateTime<Utc>,
        start: DateTime<Utc>,
    },
    /// Segment arrives after its destination has started.
    SegmentOverrun {
        segment_id: SegmentId,
        end: DateTime<Utc>,
        next_start: DateTime<Utc>,
    },
    /// Stored duration disagrees with the segment's interval.
    DurationMismatch {
        segment_id: SegmentId,
        duration_minutes: i64,
        span_minutes: i64,
    },
    CancelledEndpoint { segment_id: SegmentId, event_id: EventId },
    MissingEndpoint { segment_id: SegmentId, event_id: EventId },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overlap { first, second } => write!(f, "events {first} and {second} overlap"),
            Self::SegmentMisaligned {
                segment_id,
                expected_start,
                start,
            } => write!(
                f,
                "segment {segment_id} starts at {start}, origin ends at {expected_start}"
            ),
            Self::SegmentOverrun {
                segment_id,
                end,
                next_start,
            } => write!(
                f,
                "segment {segment_id} arrives at {end}, destination starts at {next_start}"
            ),
            Self::DurationMismatch {
                segment_id,
                duration_minutes,
                span_minutes,
            } => write!(
                f,
                "segment {segment_id} records {duration_minutes} minutes over a {span_minutes} minute span"
            ),
            Self::CancelledEndpoint { segment_id, event_id } => {
                write!(f, "segment {segment_id} references cancelled event {event_id}")
            }
            Self::MissingEndpoint { segment_id, event_id } => {
                write!(f, "segment {segment_id} references missing event {event_id}")
            }
        }
    }
}

/// Pairs of intersecting events. `events` must be sorted by start.
fn overlapping_pairs(events: &[&Event]) -> Vec<Violation> {
    let mut found = Vec::new();
    for (i, a) in events.iter().enumerate() {
        for b in events[i + 1..].iter().take_while(|b| b.start < a.end) {
            found.push(Violation::Overlap {
                first: a.id,
                second: b.id,
            });
        }
    }
    found
}

impl Planner {
    /// Audit `user_id`'s timeline. An empty result means every invariant holds.
    pub fn check_timeline(&self, user_id: UserId) -> Result<Vec<Violation>> {
        ensure_user(self.store(), user_id)?;
        let events = self.store.events_for_user(user_id, true)?;
        let by_id: HashMap<EventId, &Event> = events.iter().map(|e| (e.id, e)).collect();

        let mut active: Vec<&Event> = events.iter().filter(|e| e.is_active()).collect();
        active.sort_by_key(|e| (e.start, e.id));
        let mut violations = overlapping_pairs(&active);

        for segment in self.store.segments_for_user(user_id)? {
            let span = (segment.end - segment.start).num_minutes();
            if span != segment.duration_minutes {
                violations.push(Violation::DurationMismatch {
                    segment_id: segment.id,
                    duration_minutes: segment.duration_minutes,
                    span_minutes: span,
                });
            }

            let endpoints = [segment.from_event_id, segment.to_event_id].map(|id| (id, by_id.get(&id)));
            for (event_id, event) in endpoints {
                match event {
                    None => violations.push(Violation::MissingEndpoint {
                        segment_id: segment.id,
                        event_id,
                    }),
                    Some(e) if !e.is_active() => violations.push(Violation::CancelledEndpoint {
                        segment_id: segment.id,
                        event_id,
                    }),
                    Some(_) => {}
                }
            }

            if let Some(from) = by_id.get(&segment.from_event_id) {
                if segment.start != from.end {
                    violations.push(Violation::SegmentMisaligned {
                        segment_id: segment.id,
                        expected_start: from.end,
                        start: segment.start,
                    });
                }
            }
            if let Some(to) = by_id.get(&segment.to_event_id) {
                if segment.end > to.start {
                    violations.push(Violation::SegmentOverrun {
                        segment_id: segment.id,
                        end: segment.end,
                        next_start: to.start,
                    });
                }
            }
        }

        if !violations.is_empty() {
            tracing::warn!(user_id, count = violations.len(), "timeline check found violations");
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{EventStatus, Location, NewEvent};
    use crate::storage::{CalendarStore, Config, SqliteStore};
    use crate::travel::{TransportMode, TravelTime};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn setup() -> (Arc<SqliteStore>, Planner) {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let planner = Planner::new(store.clone(), Config::default()).unwrap();
        (store, planner)
    }

    #[test]
    fn clean_timeline_has_no_violations() {
        let (_, planner) = setup();
        let user = planner.create_user("ada").unwrap();
        let here = Location::from_coordinates(48.85, 2.35).unwrap();
        planner
            .create_event(NewEvent::new(user.id, "A", at(9, 0), at(10, 0)).with_location(here.clone()))
            .unwrap();
        planner
            .create_event(NewEvent::new(user.id, "B", at(11, 0), at(12, 0)).with_location(here))
            .unwrap();
        assert!(planner.check_timeline(user.id).unwrap().is_empty());
    }

    #[test]
    fn store_level_corruption_is_reported() {
        let (store, planner) = setup();
        let user = planner.create_user("ada").unwrap();
        // Bypass the planner to plant an overlap and a stale segment.
        let a = store
            .insert_event(&NewEvent::new(user.id, "A", at(9, 0), at(10, 0)), None)
            .unwrap();
        let b = store
            .insert_event(&NewEvent::new(user.id, "B", at(9, 30), at(10, 30)), None)
            .unwrap();
        let c = store
            .insert_event(&NewEvent::new(user.id, "C", at(12, 0), at(13, 0)), None)
            .unwrap();
        store
            .upsert_segment(&TravelTime {
                id: 0,
                user_id: user.id,
                from_event_id: a.id,
                to_event_id: c.id,
                start: at(10, 5),
                end: at(12, 30),
                duration_minutes: 10,
                distance_km: None,
                mode: TransportMode::Walking,
            })
            .unwrap();
        store.set_event_status(c.id, EventStatus::Cancelled).unwrap();

        let violations = planner.check_timeline(user.id).unwrap();
        assert!(violations.contains(&Violation::Overlap {
            first: a.id,
            second: b.id
        }));
        let kinds: Vec<_> = violations
            .iter()
            .map(|v| serde_json::to_value(v).unwrap()["kind"].as_str().unwrap().to_owned())
            .collect();
        for kind in ["segment_misaligned", "segment_overrun", "duration_mismatch", "cancelled_endpoint"] {
            assert!(kinds.iter().any(|k| k == kind), "missing {kind}: {kinds:?}");
        }
    }
}
