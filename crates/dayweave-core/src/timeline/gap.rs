//! Free-interval detection between busy blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Event;
use crate::travel::TravelTime;

/// A derived free interval. `score` is only meaningful for ranked focus slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub score: f64,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
            score: 0.0,
        }
    }

    /// Check if this slot can fit a task of given duration
    pub fn can_fit(&self, minutes: i64) -> bool {
        self.duration_minutes >= minutes
    }
}

/// Anything that occupies time on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&Event> for BusyBlock {
    fn from(event: &Event) -> Self {
        Self {
            start: event.start,
            end: event.end,
        }
    }
}

impl From<&TravelTime> for BusyBlock {
    fn from(segment: &TravelTime) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
        }
    }
}

/// Finds gaps of at least `min_gap_minutes` inside a window.
pub struct GapFinder {
    min_gap_minutes: i64,
}

impl GapFinder {
    pub fn new(min_gap_minutes: i64) -> Self {
        Self { min_gap_minutes }
    }

    /// Gaps inside `[window_start, window_end)` sorted by start.
    ///
    /// Busy blocks may overlap each other or stick out of the window;
    /// they are clipped and merged as the walk advances.
    pub fn find_gaps(
        &self,
        busy: &[BusyBlock],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<TimeSlot> {
        let mut gaps = Vec::new();
        if window_end <= window_start {
            return gaps;
        }

        let mut sorted: Vec<BusyBlock> = busy.to_vec();
        sorted.sort_by_key(|b| (b.start, b.end));

        let mut cursor = window_start;
        for block in &sorted {
            if block.end <= cursor {
                continue;
            }
            if block.start >= window_end {
                break;
            }
            if block.start > cursor {
                self.push_gap(&mut gaps, cursor, block.start.min(window_end));
            }
            cursor = cursor.max(block.end.min(window_end));
        }

        if cursor < window_end {
            self.push_gap(&mut gaps, cursor, window_end);
        }
        gaps
    }

    fn push_gap(&self, gaps: &mut Vec<TimeSlot>, start: DateTime<Utc>, end: DateTime<Utc>) {
        let slot = TimeSlot::new(start, end);
        if slot.duration_minutes >= self.min_gap_minutes {
            gaps.push(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn block(a: DateTime<Utc>, b: DateTime<Utc>) -> BusyBlock {
        BusyBlock { start: a, end: b }
    }

    #[test]
    fn gaps_around_two_events() {
        let busy = [block(at(9, 0), at(10, 0)), block(at(11, 0), at(12, 0))];
        let gaps = GapFinder::new(1).find_gaps(&busy, at(8, 0), at(18, 0));
        let spans: Vec<_> = gaps.iter().map(|g| (g.start, g.end)).collect();
        assert_eq!(
            spans,
            vec![(at(8, 0), at(9, 0)), (at(10, 0), at(11, 0)), (at(12, 0), at(18, 0))]
        );
    }

    #[test]
    fn overlapping_and_clipped_blocks_merge() {
        let busy = [
            block(at(7, 0), at(8, 30)),
            block(at(10, 0), at(11, 30)),
            block(at(11, 0), at(12, 0)),
            block(at(17, 30), at(19, 0)),
        ];
        let gaps = GapFinder::new(1).find_gaps(&busy, at(8, 0), at(18, 0));
        let spans: Vec<_> = gaps.iter().map(|g| (g.start, g.end)).collect();
        assert_eq!(spans, vec![(at(8, 30), at(10, 0)), (at(12, 0), at(17, 30))]);
    }

    #[test]
    fn short_gaps_are_dropped() {
        let busy = [block(at(9, 0), at(10, 0)), block(at(10, 30), at(17, 0))];
        let gaps = GapFinder::new(60).find_gaps(&busy, at(8, 0), at(18, 0));
        assert_eq!(gaps.len(), 2);
        assert!(gaps.iter().all(|g| g.can_fit(60)));
    }

    #[test]
    fn fully_booked_window_has_no_gaps() {
        let busy = [block(at(6, 0), at(20, 0))];
        assert!(GapFinder::new(1).find_gaps(&busy, at(8, 0), at(18, 0)).is_empty());
    }
}
