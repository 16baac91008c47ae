//! Daily commitment budget.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{Event, EventId};
use crate::error::{CoreError, Result};
use crate::timeline::local_date;

/// Committed load of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLoad {
    pub date: NaiveDate,
    /// Minutes of budget-counting events starting that day.
    pub committed_minutes: i64,
    /// Non-cancelled events starting that day, of any category.
    pub event_count: usize,
    pub budget_minutes: i64,
}

impl DayLoad {
    /// Sum the day's events. An event belongs to the day its start falls on,
    /// even when it runs past midnight.
    pub fn compute(
        events: &[Event],
        tz: Tz,
        date: NaiveDate,
        budget_minutes: i64,
        exclude: Option<EventId>,
    ) -> Self {
        let mut load = DayLoad {
            date,
            committed_minutes: 0,
            event_count: 0,
            budget_minutes,
        };
        for event in events {
            if !event.is_active() || Some(event.id) == exclude {
                continue;
            }
            if local_date(tz, event.start) != date {
                continue;
            }
            load.event_count += 1;
            if event.category.counts_toward_budget() {
                load.committed_minutes += event.duration_minutes();
            }
        }
        load
    }

    pub fn remaining_minutes(&self) -> i64 {
        (self.budget_minutes - self.committed_minutes).max(0)
    }

    /// Fail when the day cannot take another commitment.
    pub fn admit(&self, max_events: Option<usize>) -> Result<()> {
        let over_budget = self.committed_minutes >= self.budget_minutes;
        let over_count = max_events.is_some_and(|max| self.event_count >= max);
        if over_budget || over_count {
            return Err(CoreError::Overload {
                date: self.date,
                committed_minutes: self.committed_minutes,
                budget_minutes: self.budget_minutes,
                event_count: self.event_count,
            });
        }
        Ok(())
    }
}
