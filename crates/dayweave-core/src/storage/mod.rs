mod calendar_db;
mod config;
pub mod migrations;
mod store;

pub use calendar_db::SqliteStore;
pub use config::{
    Config, FocusConfig, OverloadConfig, PreferredPeriod, ReconcileConfig, TravelConfig,
};
pub use store::CalendarStore;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the data directory, creating it if needed.
///
/// `DAYWEAVE_HOME` wins when set. Otherwise `~/.config/dayweave[-dev]/`,
/// with the `-dev` suffix selected by `DAYWEAVE_ENV=dev`.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("DAYWEAVE_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .ok_or_else(|| ConfigError::DataDir("home directory is unknown".into()))?
                .join(".config");
            let env = std::env::var("DAYWEAVE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dayweave-dev")
            } else {
                base_dir.join("dayweave")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
