//! Travel-time calculators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TransportMode;
use crate::calendar::Location;

/// Duration assumed when a route cannot be measured offline.
pub const FALLBACK_MINUTES: i64 = 15;
/// Shortest trip the offline estimator will report.
pub const MIN_TRIP_MINUTES: i64 = 5;

/// Result of one calculator call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub duration_minutes: i64,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorErrorKind {
    /// Worth retrying: timeouts, rate limits, upstream 5xx.
    Transient,
    Permanent,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({kind:?})", message)]
pub struct EstimatorError {
    pub kind: EstimatorErrorKind,
    pub message: String,
}

impl EstimatorError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: EstimatorErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: EstimatorErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == EstimatorErrorKind::Transient
    }
}

/// Computes how long it takes to get from one location to another.
pub trait TravelTimeCalculator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn estimate(
        &self,
        from: &Location,
        to: &Location,
        mode: TransportMode,
    ) -> Result<Estimate, EstimatorError>;
}

/// Offline estimator: great-circle distance over an average speed per mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEstimator;

impl TravelTimeCalculator for SimpleEstimator {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn estimate(
        &self,
        from: &Location,
        to: &Location,
        mode: TransportMode,
    ) -> Result<Estimate, EstimatorError> {
        let Some(km) = from.haversine_km(to) else {
            return Ok(Estimate {
                duration_minutes: FALLBACK_MINUTES,
                distance_km: None,
            });
        };

        let minutes = (km / mode.average_speed_kmh() * 60.0).ceil() as i64;
        Ok(Estimate {
            duration_minutes: minutes.max(MIN_TRIP_MINUTES),
            distance_km: Some(km),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> Location {
        Location::from_coordinates(lat, lng).unwrap()
    }

    #[test]
    fn short_hops_are_clamped_to_minimum() {
        let a = point(48.8566, 2.3522);
        let b = point(48.8570, 2.3530);
        let est = SimpleEstimator.estimate(&a, &b, TransportMode::Driving).unwrap();
        assert_eq!(est.duration_minutes, MIN_TRIP_MINUTES);
    }

    #[test]
    fn walking_is_slower_than_driving() {
        // Roughly 10 km apart.
        let a = point(48.8566, 2.3522);
        let b = point(48.9466, 2.3522);
        let walk = SimpleEstimator.estimate(&a, &b, TransportMode::Walking).unwrap();
        let drive = SimpleEstimator.estimate(&a, &b, TransportMode::Driving).unwrap();
        assert_eq!(walk.duration_minutes, 121);
        assert_eq!(drive.duration_minutes, 16);
        assert!(walk.distance_km.unwrap() > 9.9);
    }

    #[test]
    fn address_only_locations_fall_back() {
        let a = Location::from_address("Gare de Lyon, Paris").unwrap();
        let b = point(48.8566, 2.3522);
        let est = SimpleEstimator.estimate(&a, &b, TransportMode::Transit).unwrap();
        assert_eq!(est.duration_minutes, FALLBACK_MINUTES);
        assert_eq!(est.distance_km, None);
    }
}
