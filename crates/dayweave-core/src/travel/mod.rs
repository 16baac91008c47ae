//! Travel-time segments between consecutive located events.
//!
//! Calculators are pluggable behind [`TravelTimeCalculator`]; the
//! [`EstimatorGuard`] bounds each call so a slow network service cannot
//! stall the timeline.

mod calculator;
mod distance_matrix;
mod guard;
pub mod resolver;
mod segment;

pub use calculator::{
    Estimate, EstimatorError, EstimatorErrorKind, SimpleEstimator, TravelTimeCalculator,
    FALLBACK_MINUTES, MIN_TRIP_MINUTES,
};
pub use distance_matrix::{DistanceMatrixEstimator, DEFAULT_BASE_URL};
pub use guard::{EstimatorGuard, GuardPolicy};
pub use resolver::{plan_segments, resolve, RecalcReport, SegmentPlan};
pub use segment::{TransportMode, TravelTime};
