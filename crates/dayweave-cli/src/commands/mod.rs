pub mod check;
pub mod config;
pub mod event;
pub mod focus;
pub mod load;
pub mod reconcile;
pub mod reshuffle;
pub mod task;
pub mod travel;
pub mod user;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use dayweave_core::timeline::{local_date, local_instant};
use dayweave_core::{Config, Planner, SqliteStore};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Planner over the on-disk store and configuration.
pub fn open_planner() -> Result<Planner, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    Ok(Planner::new(Arc::new(store), config)?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accepts RFC 3339, or `YYYY-MM-DDTHH:MM` / `YYYY-MM-DD HH:MM` in the
/// configured time zone.
pub fn parse_instant(value: &str, tz: Tz) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|local| local_instant(tz, local.date(), local.time()))
        .ok_or_else(|| format!("invalid time '{value}': expected RFC 3339 or YYYY-MM-DDTHH:MM"))
}

/// `YYYY-MM-DD`, or today in the configured time zone.
pub fn parse_date(value: Option<&str>, tz: Tz) -> Result<NaiveDate, String> {
    match value {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{value}': {e}")),
        None => Ok(local_date(tz, Utc::now())),
    }
}
