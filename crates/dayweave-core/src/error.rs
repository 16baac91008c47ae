//! Core error types for dayweave-core.
//!
//! Engine operations fail with one of the domain variants (`NotFound`,
//! `Overload`, `SchedulingConflict`, `ExternalEstimator`, `Validation`);
//! storage and configuration failures are wrapped in their own enums.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::travel::EstimatorError;

/// Core error type for dayweave-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced user, event, task or segment does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The day's commitment budget is already used up.
    #[error("{date} is overloaded: {committed_minutes} of {budget_minutes} committed minutes ({event_count} events)")]
    Overload {
        date: NaiveDate,
        committed_minutes: i64,
        budget_minutes: i64,
        event_count: usize,
    },

    /// A mutation or a computed travel segment would collide with the timeline.
    #[error("scheduling conflict: {0}")]
    SchedulingConflict(Conflict),

    /// The travel-time calculator failed or timed out.
    #[error("travel-time estimator failed: {0}")]
    ExternalEstimator(#[from] EstimatorError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }
}

/// Description of a timeline collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Travel from one event cannot reach the next one before it starts.
    TravelOverrun {
        from_event_id: i64,
        to_event_id: i64,
        arrival: DateTime<Utc>,
        next_start: DateTime<Utc>,
    },
    /// The candidate interval overlaps a committed event.
    Overlap {
        event_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::TravelOverrun {
                from_event_id,
                to_event_id,
                arrival,
                next_start,
            } => write!(
                f,
                "travel from event {from_event_id} arrives at {} but event {to_event_id} starts at {}",
                arrival.to_rfc3339(),
                next_start.to_rfc3339()
            ),
            Conflict::Overlap { event_id, start, end } => write!(
                f,
                "overlaps event {event_id} ({} - {})",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Unique constraint hit (duplicate pair, duplicate materialization)
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The connection mutex was poisoned by a panicking writer
    #[error("Database connection poisoned")]
    Poisoned,

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not resolve the data directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Two events handed to the resolver belong to different users
    #[error("events {from_event_id} and {to_event_id} belong to different users")]
    ForeignEvents { from_event_id: i64, to_event_id: i64 },

    /// An event has no location to route from or to
    #[error("event {0} has no location")]
    MissingLocation(i64),

    /// The pair is not in timeline order
    #[error("event {from_event_id} ends after event {to_event_id} starts")]
    OutOfOrder { from_event_id: i64, to_event_id: i64 },
}

impl ValidationError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg) => match code.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::Constraint(msg.clone().unwrap_or_else(|| err.to_string()))
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
