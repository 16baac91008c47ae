//! Timeline queries and free-slot detection.
//!
//! This module provides:
//! - Window queries over a user's committed events
//! - Calendar-day boundaries in the configured zone
//! - Gap detection between busy blocks and focus-slot ranking

mod focus;
mod gap;
mod query;
mod window;

pub use focus::FocusSlotFinder;
pub use gap::{BusyBlock, GapFinder, TimeSlot};
pub use query::{events_in_window, TimelineFilter};
pub(crate) use query::ensure_user;
pub use window::{day_window, local_date, local_instant};
