//! # Dayweave Core Library
//!
//! Calendar scheduling engine that keeps a user's timeline consistent:
//! committed events never overlap, travel between consecutive located
//! events is derived and stored as segments, days cannot be loaded past a
//! configured budget, and cancelled events can be reshuffled into backlog
//! tasks.
//!
//! ## Architecture
//!
//! - **Calendar**: users, events, tasks, locations and categories
//! - **Storage**: SQLite-backed [`CalendarStore`] and TOML configuration
//! - **Travel**: travel-time calculators, the retrying guard and the
//!   segment resolver
//! - **Timeline**: window queries, gap detection and focus slot ranking
//! - **Planner**: the [`Planner`] facade serializing mutations per user
//!
//! ## Key Components
//!
//! - [`Planner`]: every engine operation
//! - [`SqliteStore`]: persistence
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod error;
pub mod planner;
pub mod storage;
pub mod timeline;
pub mod travel;

pub use calendar::{
    Category, Event, EventPatch, EventStatus, FocusPreference, Location, NewEvent, NewTask, Task,
    TaskStatus, User,
};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use planner::{DayLoad, Planner, ReconcileLoop, ReshuffleOutcome, Violation};
pub use storage::{CalendarStore, Config, SqliteStore};
pub use timeline::TimeSlot;
pub use travel::{RecalcReport, TransportMode, TravelTime, TravelTimeCalculator};
