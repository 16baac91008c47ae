//! Travel segment resolution and full-timeline recalculation plans.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{TransportMode, TravelTime, TravelTimeCalculator};
use crate::calendar::{Event, EventId, UserId};
use crate::error::{Conflict, CoreError, Result, ValidationError};

/// Compute the segment from `from` to `to` without persisting it.
///
/// Preconditions are checked in order: same owner, both located, and
/// `from` ending no later than `to` starts. A segment that would run past
/// `to.start` is reported as a conflict rather than truncated.
pub fn resolve(
    calculator: &dyn TravelTimeCalculator,
    from: &Event,
    to: &Event,
    mode: TransportMode,
) -> Result<TravelTime> {
    if from.user_id != to.user_id {
        return Err(ValidationError::ForeignEvents {
            from_event_id: from.id,
            to_event_id: to.id,
        }
        .into());
    }
    let (Some(from_loc), Some(to_loc)) = (&from.location, &to.location) else {
        let missing = if from.location.is_none() { from.id } else { to.id };
        return Err(ValidationError::MissingLocation(missing).into());
    };
    if from.end > to.start {
        return Err(ValidationError::OutOfOrder {
            from_event_id: from.id,
            to_event_id: to.id,
        }
        .into());
    }

    let estimate = calculator.estimate(from_loc, to_loc, mode)?;
    let (start, end) = TravelTime::span(from.end, estimate.duration_minutes);
    if end > to.start {
        return Err(CoreError::SchedulingConflict(Conflict::TravelOverrun {
            from_event_id: from.id,
            to_event_id: to.id,
            arrival: end,
            next_start: to.start,
        }));
    }

    Ok(TravelTime {
        id: 0,
        user_id: from.user_id,
        from_event_id: from.id,
        to_event_id: to.id,
        start,
        end,
        duration_minutes: estimate.duration_minutes,
        distance_km: estimate.distance_km,
        mode,
    })
}

/// Pick the mode for travelling into `to`: the event's own preference,
/// then the existing segment's mode, then the category default.
pub fn choose_mode(to: &Event, existing: Option<&TravelTime>, fallback: TransportMode) -> TransportMode {
    to.transport_mode
        .or_else(|| existing.map(|s| s.mode))
        .or_else(|| to.category.default_transport_mode())
        .unwrap_or(fallback)
}

/// Consecutive pairs of the active timeline where both ends are located.
///
/// `events` must be the user's non-cancelled events sorted by start.
pub fn located_pairs(events: &[Event]) -> Vec<(&Event, &Event)> {
    events
        .windows(2)
        .filter(|w| w[0].is_located() && w[1].is_located())
        .map(|w| (&w[0], &w[1]))
        .collect()
}

/// Writes needed to bring stored segments in line with the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub create: Vec<TravelTime>,
    /// Carry the id of the stored segment they replace.
    pub update: Vec<TravelTime>,
    pub unchanged: Vec<TravelTime>,
    pub delete: Vec<TravelTime>,
}

impl SegmentPlan {
    pub fn has_writes(&self) -> bool {
        !(self.create.is_empty() && self.update.is_empty() && self.delete.is_empty())
    }

    pub fn report(&self, user_id: UserId, calculator: &str) -> RecalcReport {
        RecalcReport {
            user_id,
            calculator: calculator.to_string(),
            created: self.create.len(),
            updated: self.update.len(),
            unchanged: self.unchanged.len(),
            deleted: self.delete.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub user_id: UserId,
    pub calculator: String,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

/// Resolve every located pair and diff the result against `existing`.
///
/// Any failure aborts the whole plan; nothing partial is returned.
pub fn plan_segments(
    calculator: &dyn TravelTimeCalculator,
    events: &[Event],
    existing: &[TravelTime],
    default_mode: TransportMode,
) -> Result<SegmentPlan> {
    let mut stored: HashMap<(EventId, EventId), &TravelTime> =
        existing.iter().map(|s| (s.pair(), s)).collect();
    let mut plan = SegmentPlan::default();

    for (from, to) in located_pairs(events) {
        let current = stored.remove(&(from.id, to.id));
        let mode = choose_mode(to, current, default_mode);
        let mut fresh = resolve(calculator, from, to, mode)?;
        match current {
            None => plan.create.push(fresh),
            Some(old) if old.same_route(&fresh) => plan.unchanged.push(old.clone()),
            Some(old) => {
                fresh.id = old.id;
                plan.update.push(fresh);
            }
        }
    }

    // Whatever was not matched no longer connects a consecutive located pair.
    let mut stale: Vec<TravelTime> = stored.into_values().cloned().collect();
    stale.sort_by_key(|s| (s.start, s.id));
    plan.delete = stale;

    tracing::debug!(
        create = plan.create.len(),
        update = plan.update.len(),
        unchanged = plan.unchanged.len(),
        delete = plan.delete.len(),
        "segment plan built"
    );
    Ok(plan)
}
