//! Calendar-day arithmetic in the configured zone.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The instant at which local wall-clock `time` occurs on `date`.
///
/// An ambiguous time (clocks going back) resolves to the earlier instant;
/// a skipped time (clocks going forward) to the first valid instant after it.
pub fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt.with_timezone(&Utc);
    }
    // Inside a DST gap: walk forward until the wall clock exists again.
    let mut probe = naive;
    for _ in 0..(4 * 60) {
        probe += Duration::minutes(1);
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
            return dt.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&naive)
}

/// `[local midnight, next local midnight)` for `date`.
pub fn day_window(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_instant(tz, date, NaiveTime::MIN);
    let next = date.succ_opt().unwrap_or(date);
    let end = local_instant(tz, next, NaiveTime::MIN);
    (start, end)
}

/// Calendar date of `instant` in `tz`.
pub fn local_date(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
