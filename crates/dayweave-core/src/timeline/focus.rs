//! Ranking free gaps as focus-work candidates.

use chrono::{DateTime, Utc};

use super::gap::{BusyBlock, GapFinder, TimeSlot};

/// Weight of the "earlier is better" penalty; a slot at the very end of
/// the window keeps half its length as score.
const LATENESS_PENALTY: f64 = 0.5;

/// Scores gaps within one working window.
#[derive(Debug, Clone, Copy)]
pub struct FocusSlotFinder {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub min_block_minutes: i64,
    /// Bonus interval: minutes of overlap are added to the score.
    pub preferred: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl FocusSlotFinder {
    /// Gaps of at least `min_block_minutes`, best first; ties go to the
    /// earlier slot.
    pub fn find(&self, busy: &[BusyBlock]) -> Vec<TimeSlot> {
        let mut slots = GapFinder::new(self.min_block_minutes).find_gaps(
            busy,
            self.window_start,
            self.window_end,
        );
        for slot in &mut slots {
            slot.score = self.score(slot);
        }
        slots.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.start.cmp(&b.start)));
        slots
    }

    fn score(&self, slot: &TimeSlot) -> f64 {
        let window = (self.window_end - self.window_start).num_minutes().max(1) as f64;
        let offset = (slot.start - self.window_start).num_minutes() as f64 / window;
        let base = slot.duration_minutes as f64 * (1.0 - LATENESS_PENALTY * offset);
        base + self.preferred_overlap(slot) as f64
    }

    fn preferred_overlap(&self, slot: &TimeSlot) -> i64 {
        let Some((p_start, p_end)) = self.preferred else {
            return 0;
        };
        let start = slot.start.max(p_start);
        let end = slot.end.min(p_end);
        if end > start {
            (end - start).num_minutes()
        } else {
            0
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

    fn finder(preferred: Option<(DateTime<Utc>, DateTime<Utc>)>) -> FocusSlotFinder {
        FocusSlotFinder {
            window_start: at(8, 0),
            window_end: at(18, 0),
            min_block_minutes: 60,
            preferred,
        }
    }

    #[test]
    fn empty_day_is_one_slot() {
        let slots = finder(None).find(&[]);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, at(8, 0));
        assert_eq!(slots[0].duration_minutes, 600);
        assert_eq!(slots[0].score, 600.0);
    }

    #[test]
    fn long_afternoon_beats_short_morning() {
        let busy = [
            BusyBlock { start: at(9, 0), end: at(10, 0) },
            BusyBlock { start: at(11, 0), end: at(12, 0) },
        ];
        let slots = finder(None).find(&busy);
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        // 12-18: 360 * 0.8 = 288; 8-9: 60; 10-11: 60 * 0.9 = 54.
        assert_eq!(starts, vec![at(12, 0), at(8, 0), at(10, 0)]);
        assert!((slots[0].score - 288.0).abs() < 1e-9);
    }

    #[test]
    fn preferred_period_adds_overlap_bonus() {
        let busy = [BusyBlock { start: at(10, 0), end: at(14, 0) }];
        let plain = finder(None).find(&busy);
        assert_eq!(plain[0].start, at(14, 0));

        let morning = finder(Some((at(9, 0), at(12, 0)))).find(&busy);
        // 8-10: 120 + 60 bonus = 180; 14-18: 240 * 0.7 = 168.
        assert_eq!(morning[0].start, at(8, 0));
        assert!((morning[0].score - 180.0).abs() < 1e-9);
    }
}
