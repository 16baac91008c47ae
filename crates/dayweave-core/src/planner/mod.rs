//! Scheduling engine facade.
//!
//! [`Planner`] owns the store, configuration, travel calculators, task
//! selection strategy and per-user lock registry. Every mutating operation
//! runs under the owning user's lock so budget checks and commits cannot
//! interleave with another edit of the same timeline.

mod check;
mod intake;
mod locks;
mod overload;
mod reconcile;
mod reshuffle;
mod strategy;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

pub use check::Violation;
pub use intake::{ImportRejection, ImportReport};
pub use locks::UserLocks;
pub use overload::DayLoad;
pub use reconcile::{ReconcileHandle, ReconcileLoop, ReconcileSummary};
pub use reshuffle::ReshuffleOutcome;
pub use strategy::{HighestPriorityFit, TaskSelectionStrategy};

use crate::calendar::{Event, EventId, FocusPreference, UserId};
use crate::error::{CoreError, Result};
use crate::storage::{CalendarStore, Config};
use crate::timeline::{
    self, day_window, local_date, local_instant, BusyBlock, FocusSlotFinder, TimeSlot,
    TimelineFilter,
};
use crate::travel::{
    plan_segments, resolver, DistanceMatrixEstimator, EstimatorGuard, RecalcReport,
    SimpleEstimator, TransportMode, TravelTime, TravelTimeCalculator,
};

pub struct Planner {
    store: Arc<dyn CalendarStore>,
    config: Config,
    tz: Tz,
    offline: EstimatorGuard,
    network: Option<EstimatorGuard>,
    strategy: Box<dyn TaskSelectionStrategy>,
    locks: UserLocks,
}

impl Planner {
    /// Build a planner over `store`.
    ///
    /// The network estimator is enabled when an API key is configured; if it
    /// cannot be constructed the planner still starts, offline only.
    ///
    /// # Errors
    /// Returns an error if the configuration does not validate.
    pub fn new(store: Arc<dyn CalendarStore>, config: Config) -> Result<Self> {
        config.validate()?;
        let tz = config.tz()?;
        let policy = config.travel.guard_policy();

        let network = match config.travel.api_key() {
            Some(key) => match DistanceMatrixEstimator::new(
                &config.travel.base_url,
                key,
                Duration::from_millis(config.travel.timeout_ms),
            ) {
                Ok(estimator) => Some(EstimatorGuard::new(Arc::new(estimator), policy)),
                Err(e) => {
                    tracing::warn!(error = %e, "distance matrix estimator unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            store,
            tz,
            offline: EstimatorGuard::new(Arc::new(SimpleEstimator), policy),
            network,
            strategy: Box::new(HighestPriorityFit),
            locks: UserLocks::new(),
            config,
        })
    }

    /// Replace the offline calculator.
    pub fn with_calculator(mut self, calculator: Arc<dyn TravelTimeCalculator>) -> Self {
        self.offline = EstimatorGuard::new(calculator, self.config.travel.guard_policy());
        self
    }

    /// Replace (or install) the network calculator.
    pub fn with_network_calculator(mut self, calculator: Arc<dyn TravelTimeCalculator>) -> Self {
        self.network = Some(EstimatorGuard::new(calculator, self.config.travel.guard_policy()));
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn TaskSelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn CalendarStore {
        self.store.as_ref()
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    fn calculator(&self, use_network: bool) -> &EstimatorGuard {
        match (&self.network, use_network) {
            (Some(network), true) => network,
            (None, true) => {
                tracing::warn!("no distance matrix API key configured, using offline estimator");
                &self.offline
            }
            (_, false) => &self.offline,
        }
    }

    // === Timeline queries ===

    /// Non-cancelled events intersecting `[start, end)`.
    pub fn events_in_window(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        timeline::events_in_window(self.store(), user_id, start, end, TimelineFilter::default())
    }

    pub fn events_in_window_with(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: TimelineFilter,
    ) -> Result<Vec<Event>> {
        timeline::events_in_window(self.store(), user_id, start, end, filter)
    }

    /// Local midnight to local midnight, in UTC.
    pub fn day_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        day_window(self.tz, date)
    }

    pub fn events_on_day(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<Event>> {
        let (start, end) = self.day_window(date);
        self.events_in_window(user_id, start, end)
    }

    pub fn segments_on_day(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<TravelTime>> {
        timeline::ensure_user(self.store(), user_id)?;
        let (start, end) = self.day_window(date);
        self.store.segments_overlapping(user_id, start, end)
    }

    // === Overload ===

    pub fn day_load(&self, user_id: UserId, date: NaiveDate) -> Result<DayLoad> {
        self.day_load_excluding(user_id, date, None)
    }

    fn day_load_excluding(
        &self,
        user_id: UserId,
        date: NaiveDate,
        exclude: Option<EventId>,
    ) -> Result<DayLoad> {
        let events = self.events_on_day(user_id, date)?;
        Ok(DayLoad::compute(
            &events,
            self.tz,
            date,
            self.config.overload.daily_budget_minutes,
            exclude,
        ))
    }

    /// Fail with `Overload` when the day of `candidate_start` is already full.
    ///
    /// Callers that go on to commit must hold the user's lock.
    pub fn validate_not_overloaded(&self, user_id: UserId, candidate_start: DateTime<Utc>) -> Result<()> {
        self.check_overload(user_id, candidate_start, None)
    }

    fn check_overload(
        &self,
        user_id: UserId,
        candidate_start: DateTime<Utc>,
        exclude: Option<EventId>,
    ) -> Result<()> {
        let date = local_date(self.tz, candidate_start);
        let max_events = self.stored_preference(user_id)?.max_events_per_day(&self.config);
        self.day_load_excluding(user_id, date, exclude)?.admit(max_events)
    }

    // === Focus slots ===

    /// Ranked free gaps of the working window on `date`.
    pub fn find_focus_slots(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        timeline::ensure_user(self.store(), user_id)?;
        let focus = &self.config.focus;
        let preference = self.stored_preference(user_id)?;
        let (work_start, work_end) = focus.work_hours()?;
        let window_start = local_instant(self.tz, date, work_start);
        let window_end = local_instant(self.tz, date, work_end);

        let mut busy: Vec<BusyBlock> = self
            .events_in_window(user_id, window_start, window_end)?
            .iter()
            .map(BusyBlock::from)
            .collect();
        if focus.travel_counts_as_busy {
            busy.extend(
                self.store
                    .segments_overlapping(user_id, window_start, window_end)?
                    .iter()
                    .map(BusyBlock::from),
            );
        }

        let preferred = preference.preferred_period(&self.config).hours().and_then(|(from, to)| {
            let from = NaiveTime::from_hms_opt(from, 0, 0)?;
            let to = NaiveTime::from_hms_opt(to, 0, 0)?;
            Some((local_instant(self.tz, date, from), local_instant(self.tz, date, to)))
        });

        let finder = FocusSlotFinder {
            window_start,
            window_end,
            min_block_minutes: preference.min_focus_minutes(&self.config),
            preferred,
        };
        Ok(finder.find(&busy))
    }

    // === Travel ===

    /// Compute (without storing) the segment between two events.
    pub fn resolve(
        &self,
        from: &Event,
        to: &Event,
        mode: TransportMode,
        use_network: bool,
    ) -> Result<TravelTime> {
        resolver::resolve(self.calculator(use_network), from, to, mode)
    }

    /// Resolve the segment between two stored events and persist it.
    ///
    /// Without an explicit `mode` the destination's preference, then the
    /// existing segment's mode, then the configured default is used.
    pub fn resolve_and_store(
        &self,
        from_id: EventId,
        to_id: EventId,
        mode: Option<TransportMode>,
        use_network: bool,
    ) -> Result<TravelTime> {
        let owner = self.load_event(from_id)?.user_id;
        self.locks.with_user(owner, || {
            let from = self.load_event(from_id)?;
            let to = self.load_event(to_id)?;
            let mode = match mode {
                Some(mode) => mode,
                None => {
                    let existing = self.store.get_segment(from_id, to_id)?;
                    resolver::choose_mode(&to, existing.as_ref(), self.config.travel.default_mode)
                }
            };
            let segment = self.resolve(&from, &to, mode, use_network)?;
            let stored = self.store.upsert_segment(&segment)?;
            tracing::info!(
                user_id = owner,
                from_event_id = from_id,
                to_event_id = to_id,
                minutes = stored.duration_minutes,
                "travel segment stored"
            );
            Ok(stored)
        })
    }

    /// Recompute every travel segment of `user_id` in one all-or-nothing pass.
    pub fn recalculate_all(&self, user_id: UserId, use_network: bool) -> Result<RecalcReport> {
        timeline::ensure_user(self.store(), user_id)?;
        self.locks
            .with_user(user_id, || self.recalculate_locked(user_id, use_network))
    }

    /// Caller holds the user's lock.
    fn recalculate_locked(&self, user_id: UserId, use_network: bool) -> Result<RecalcReport> {
        let calculator = self.calculator(use_network);
        let events = self.store.events_for_user(user_id, false)?;
        let existing = self.store.segments_for_user(user_id)?;
        let plan = plan_segments(calculator, &events, &existing, self.config.travel.default_mode)?;
        self.store.apply_segment_plan(&plan)?;

        let report = plan.report(user_id, calculator.name());
        tracing::info!(
            user_id,
            calculator = %report.calculator,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            deleted = report.deleted,
            "travel segments recalculated"
        );
        Ok(report)
    }

    /// Post-commit segment refresh. Failures are logged, never returned:
    /// the committed mutation stands and the reconcile loop retries later.
    fn refresh_segments(&self, user_id: UserId) {
        if let Err(e) = self.recalculate_locked(user_id, self.config.reconcile.use_network) {
            tracing::warn!(user_id, error = %e, "travel segment refresh failed");
        }
    }

    fn stored_preference(&self, user_id: UserId) -> Result<FocusPreference> {
        Ok(self
            .store
            .get_preference(user_id)?
            .unwrap_or_else(|| FocusPreference::new(user_id)))
    }

    fn load_event(&self, id: EventId) -> Result<Event> {
        self.store
            .get_event(id)?
            .ok_or_else(|| CoreError::not_found("event", id))
    }
}
