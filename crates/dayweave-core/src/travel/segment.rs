use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{EventId, SegmentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    Walking,
    Driving,
    Transit,
    Cycling,
}

impl TransportMode {
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Walking,
        TransportMode::Driving,
        TransportMode::Transit,
        TransportMode::Cycling,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Walking => "WALKING",
            TransportMode::Driving => "DRIVING",
            TransportMode::Transit => "TRANSIT",
            TransportMode::Cycling => "CYCLING",
        }
    }

    /// Mode name understood by the Distance Matrix API.
    pub fn api_name(self) -> &'static str {
        match self {
            TransportMode::Walking => "walking",
            TransportMode::Driving => "driving",
            TransportMode::Transit => "transit",
            TransportMode::Cycling => "bicycling",
        }
    }

    /// Average door-to-door speed used by the offline estimator.
    pub fn average_speed_kmh(self) -> f64 {
        match self {
            TransportMode::Walking => 5.0,
            TransportMode::Cycling => 15.0,
            TransportMode::Driving => 40.0,
            TransportMode::Transit => 25.0,
        }
    }
}

impl Default for TransportMode {
    fn default() -> Self {
        TransportMode::Driving
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TransportMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s) || m.api_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown transport mode: {s}"))
    }
}

/// Derived interval for transit between two consecutive located events.
///
/// `start` equals the origin event's end and `end` never passes the
/// destination's start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelTime {
    /// Zero until the segment has been persisted.
    pub id: SegmentId,
    pub user_id: UserId,
    pub from_event_id: EventId,
    pub to_event_id: EventId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub distance_km: Option<f64>,
    pub mode: TransportMode,
}

impl TravelTime {
    pub fn pair(&self) -> (EventId, EventId) {
        (self.from_event_id, self.to_event_id)
    }

    /// Whether the computed part of two segments is identical, ignoring ids.
    pub fn same_route(&self, other: &TravelTime) -> bool {
        self.pair() == other.pair()
            && self.start == other.start
            && self.end == other.end
            && self.duration_minutes == other.duration_minutes
            && self.mode == other.mode
            && match (self.distance_km, other.distance_km) {
                (Some(a), Some(b)) => (a - b).abs() < 1e-6,
                (None, None) => true,
                _ => false,
            }
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    pub(crate) fn span(start: DateTime<Utc>, minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        (start, start + Duration::minutes(minutes))
    }
}
