//! End-to-end properties of the planner over an in-memory store.
//!
//! Every test that mutates a timeline finishes by asserting that
//! `check_timeline` reports nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dayweave_core::calendar::{Location, NewEvent, NewTask, UserId};
use dayweave_core::error::Conflict;
use dayweave_core::planner::ReshuffleOutcome;
use dayweave_core::travel::{Estimate, EstimatorError, TransportMode, TravelTimeCalculator};
use dayweave_core::{CalendarStore, Config, CoreError, EventStatus, Planner, SqliteStore};

// ============================================================================
// Test Helpers
// ============================================================================

/// Fixed-duration calculator that can be switched into a failing state.
struct Switchable {
    minutes: i64,
    failing: AtomicBool,
}

impl Switchable {
    fn new(minutes: i64) -> Arc<Self> {
        Arc::new(Self {
            minutes,
            failing: AtomicBool::new(false),
        })
    }
}

impl TravelTimeCalculator for Switchable {
    fn name(&self) -> &'static str {
        "switchable"
    }

    fn estimate(&self, _: &Location, _: &Location, _: TransportMode) -> Result<Estimate, EstimatorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EstimatorError::permanent("route service unavailable"));
        }
        Ok(Estimate {
            duration_minutes: self.minutes,
            distance_km: None,
        })
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn here() -> Location {
    Location::from_coordinates(48.8566, 2.3522).unwrap()
}

fn planner_with(config: Config) -> Planner {
    Planner::new(Arc::new(SqliteStore::open_memory().unwrap()), config).unwrap()
}

fn planner() -> Planner {
    planner_with(Config::default())
}

fn assert_consistent(planner: &Planner, user: UserId) {
    let violations = planner.check_timeline(user).unwrap();
    assert!(violations.is_empty(), "violations: {violations:?}");
}

// ============================================================================
// Timeline and focus slots
// ============================================================================

#[test]
fn focus_slots_between_two_meetings() {
    let planner = planner();
    let user = planner.create_user("ada").unwrap().id;
    planner
        .create_event(NewEvent::new(user, "Standup", at(9, 0), at(10, 0)))
        .unwrap();
    planner
        .create_event(NewEvent::new(user, "Review", at(11, 0), at(12, 0)))
        .unwrap();

    let slots = planner.find_focus_slots(user, date()).unwrap();
    let mut spans: Vec<_> = slots.iter().map(|s| (s.start, s.end)).collect();
    // Ranked by score, the afternoon wins on length.
    assert_eq!(spans[0], (at(12, 0), at(18, 0)));
    assert!(slots.windows(2).all(|w| w[0].score >= w[1].score));

    spans.sort();
    assert_eq!(
        spans,
        vec![(at(8, 0), at(9, 0)), (at(10, 0), at(11, 0)), (at(12, 0), at(18, 0))]
    );
    assert_consistent(&planner, user);
}

#[test]
fn empty_day_is_one_slot_and_full_day_is_none() {
    let planner = planner();
    let user = planner.create_user("ada").unwrap().id;
    let slots = planner.find_focus_slots(user, date()).unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!((slots[0].start, slots[0].end), (at(8, 0), at(18, 0)));

    planner
        .create_event(NewEvent::new(user, "Offsite", at(7, 0), at(19, 0)))
        .unwrap();
    assert!(planner.find_focus_slots(user, date()).unwrap().is_empty());
}

// ============================================================================
// Overload
// ============================================================================

#[test]
fn eight_committed_hours_block_the_day() {
    let planner = planner();
    let user = planner.create_user("ada").unwrap().id;
    assert!(planner.validate_not_overloaded(user, at(9, 0)).is_ok());

    planner
        .create_event(NewEvent::new(user, "Morning", at(8, 0), at(12, 0)))
        .unwrap();
    planner
        .create_event(NewEvent::new(user, "Afternoon", at(13, 0), at(17, 0)))
        .unwrap();

    let load = planner.day_load(user, date()).unwrap();
    assert_eq!(load.committed_minutes, 480);
    assert_eq!(load.remaining_minutes(), 0);

    let err = planner
        .create_event(NewEvent::new(user, "Evening", at(18, 0), at(19, 0)))
        .unwrap_err();
    assert!(matches!(err, CoreError::Overload { budget_minutes: 480, .. }));
    assert_consistent(&planner, user);
}

#[test]
fn concurrent_creates_cannot_share_the_last_slot_of_budget() {
    let mut config = Config::default();
    config.overload.daily_budget_minutes = 60;
    let planner = Arc::new(planner_with(config));
    let user = planner.create_user("ada").unwrap().id;

    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let planner = planner.clone();
            thread::spawn(move || {
                let start = at(8 + i, 0);
                let end = start + chrono::Duration::minutes(45);
                planner
                    .create_event(NewEvent::new(user, format!("block {i}"), start, end))
                    .is_ok()
            })
        })
        .collect();
    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    // 0 < 60 admits the first, 45 < 60 admits the second, 90 stops the rest.
    assert_eq!(admitted, 2);
    assert_consistent(&planner, user);
}

// ============================================================================
// Travel segments
// ============================================================================

#[test]
fn resolve_places_segment_after_origin() {
    let calc = Switchable::new(15);
    let store = Arc::new(SqliteStore::open_memory().unwrap());
    let planner = Planner::new(store.clone(), Config::default())
        .unwrap()
        .with_calculator(calc);
    let user = planner.create_user("ada").unwrap().id;

    let from = planner
        .create_event(NewEvent::new(user, "Gym", at(9, 0), at(10, 0)).with_location(here()))
        .unwrap();
    let to = planner
        .create_event(NewEvent::new(user, "Work", at(10, 30), at(12, 0)).with_location(here()))
        .unwrap();
    let segment = planner.resolve(&from, &to, TransportMode::Driving, false).unwrap();
    assert_eq!((segment.start, segment.end), (at(10, 0), at(10, 15)));
    assert_eq!(segment.duration_minutes, 15);

    // Planted directly so the intake checks do not reject it first.
    let tight = store
        .insert_event(&NewEvent::new(user, "Call", at(12, 10), at(12, 30)).with_location(here()), None)
        .unwrap();
    let err = planner.resolve(&to, &tight, TransportMode::Driving, false).unwrap_err();
    assert!(matches!(
        err,
        CoreError::SchedulingConflict(Conflict::TravelOverrun { to_event_id, .. }) if to_event_id == tight.id
    ));
}

#[test]
fn intake_rejects_an_event_that_strands_the_next_one() {
    let planner = planner().with_calculator(Switchable::new(20));
    let user = planner.create_user("ada").unwrap().id;
    planner
        .create_event(NewEvent::new(user, "Client", at(11, 0), at(12, 0)).with_location(here()))
        .unwrap();
    // Ends ten minutes before a located event that is twenty minutes away.
    let err = planner
        .create_event(NewEvent::new(user, "Coffee", at(10, 0), at(10, 50)).with_location(here()))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::SchedulingConflict(Conflict::TravelOverrun { .. })
    ));
    // Without a location there is nothing to travel from.
    planner
        .create_event(NewEvent::new(user, "Call", at(10, 0), at(10, 50)))
        .unwrap();
    assert_consistent(&planner, user);
}

#[test]
fn recalculating_twice_changes_nothing() {
    let planner = planner().with_calculator(Switchable::new(10));
    let user = planner.create_user("ada").unwrap().id;
    for (h, name) in [(8, "A"), (10, "B"), (13, "C")] {
        planner
            .create_event(NewEvent::new(user, name, at(h, 0), at(h + 1, 0)).with_location(here()))
            .unwrap();
    }
    let before = planner.store().segments_for_user(user).unwrap();
    assert_eq!(before.len(), 2);

    let first = planner.recalculate_all(user, false).unwrap();
    let second = planner.recalculate_all(user, false).unwrap();
    for report in [&first, &second] {
        assert_eq!((report.created, report.updated, report.deleted), (0, 0, 0));
        assert_eq!(report.unchanged, 2);
    }
    assert_eq!(planner.store().segments_for_user(user).unwrap(), before);
    assert_consistent(&planner, user);
}

#[test]
fn failing_estimator_keeps_previous_segments() {
    let calc = Switchable::new(10);
    let planner = planner().with_calculator(calc.clone());
    let user = planner.create_user("ada").unwrap().id;
    let ids: Vec<_> = [(8, "A"), (10, "B"), (13, "C")]
        .into_iter()
        .map(|(h, name)| {
            planner
                .create_event(NewEvent::new(user, name, at(h, 0), at(h + 1, 0)).with_location(here()))
                .unwrap()
                .id
        })
        .collect();
    let before = planner.store().segments_for_user(user).unwrap();
    assert_eq!(before.len(), 2);

    calc.failing.store(true, Ordering::SeqCst);
    assert!(matches!(
        planner.recalculate_all(user, false),
        Err(CoreError::ExternalEstimator(_))
    ));
    assert_eq!(planner.store().segments_for_user(user).unwrap(), before);

    // The cancel commits; the A -> C estimate it needs fails, so nothing moves.
    let cancelled = planner.cancel_event(ids[1]).unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);
    assert_eq!(planner.store().segments_for_user(user).unwrap(), before);

    calc.failing.store(false, Ordering::SeqCst);
    let report = planner.recalculate_all(user, false).unwrap();
    assert_eq!((report.created, report.deleted), (1, 2));
    let segments = planner.store().segments_for_user(user).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!((segments[0].from_event_id, segments[0].to_event_id), (ids[0], ids[2]));
    assert_consistent(&planner, user);
}

#[test]
fn cancelling_a_middle_event_reconnects_neighbours() {
    let planner = planner().with_calculator(Switchable::new(10));
    let user = planner.create_user("ada").unwrap().id;
    let ids: Vec<_> = [(8, "A"), (10, "B"), (13, "C")]
        .into_iter()
        .map(|(h, name)| {
            planner
                .create_event(NewEvent::new(user, name, at(h, 0), at(h + 1, 0)).with_location(here()))
                .unwrap()
                .id
        })
        .collect();

    planner.cancel_event(ids[1]).unwrap();
    let pairs: Vec<_> = planner
        .store()
        .segments_for_user(user)
        .unwrap()
        .iter()
        .map(|s| s.pair())
        .collect();
    assert_eq!(pairs, vec![(ids[0], ids[2])]);
    assert_consistent(&planner, user);
}

// ============================================================================
// Reshuffle
// ============================================================================

#[test]
fn reshuffle_picks_priority_five_and_is_idempotent() {
    let planner = planner();
    let user = planner.create_user("ada").unwrap().id;
    let lecture = planner
        .create_event(NewEvent::new(user, "Lecture", at(14, 0), at(15, 0)))
        .unwrap();
    planner.create_task(NewTask::new(user, "Reading", 50, 3)).unwrap();
    let essay = planner.create_task(NewTask::new(user, "Essay", 45, 5)).unwrap();

    let first = planner.reshuffle(lecture.id).unwrap();
    let ReshuffleOutcome::Materialized { event, task_id, .. } = &first else {
        panic!("unexpected outcome {first:?}");
    };
    assert_eq!(*task_id, essay.id);
    assert_eq!((event.start, event.end), (at(14, 0), at(14, 45)));
    assert_eq!(
        planner.store().get_event(lecture.id).unwrap().unwrap().status,
        EventStatus::Cancelled
    );

    let retry = planner.reshuffle(lecture.id).unwrap();
    assert!(matches!(retry, ReshuffleOutcome::Reconciled { .. }));
    let active = planner.events_on_day(user, date()).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, event.id);
    assert_consistent(&planner, user);
}

#[test]
fn task_whose_event_was_attended_is_not_picked_again() {
    let planner = planner();
    let user = planner.create_user("ada").unwrap().id;
    let a = planner
        .create_event(NewEvent::new(user, "A", at(9, 0), at(10, 0)))
        .unwrap();
    let b = planner
        .create_event(NewEvent::new(user, "B", at(11, 0), at(12, 0)))
        .unwrap();
    planner.create_task(NewTask::new(user, "Only", 30, 1)).unwrap();

    let first = planner.reshuffle(a.id).unwrap();
    let materialized = first.event().unwrap().id;
    planner.confirm_event(materialized).unwrap();

    assert!(matches!(
        planner.reshuffle(b.id).unwrap(),
        ReshuffleOutcome::NoEligibleTask { .. }
    ));
    assert_consistent(&planner, user);
}
