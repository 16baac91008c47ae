//! TOML-based engine configuration.
//!
//! Holds the tunables of the scheduling engine:
//! - the time zone that defines calendar days
//! - the daily commitment budget
//! - the focus-slot working window and minimum block length
//! - travel estimator selection, timeout and retry policy
//! - the background reconcile interval
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::travel::{GuardPolicy, TransportMode, DEFAULT_BASE_URL};

/// Environment variable consulted when `travel.api_key` is empty.
pub const API_KEY_ENV: &str = "DAYWEAVE_MAPS_API_KEY";

/// Daily commitment budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadConfig {
    #[serde(default = "default_daily_budget")]
    pub daily_budget_minutes: i64,
    /// 0 disables the per-day event cap.
    #[serde(default)]
    pub max_events_per_day: u32,
}

/// Part of the day a user prefers for deep work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreferredPeriod {
    #[default]
    None,
    Morning,
    Afternoon,
    Evening,
}

impl PreferredPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferredPeriod::None => "none",
            PreferredPeriod::Morning => "morning",
            PreferredPeriod::Afternoon => "afternoon",
            PreferredPeriod::Evening => "evening",
        }
    }

    /// Local wall-clock hours `[start, end)` of the period.
    pub fn hours(self) -> Option<(u32, u32)> {
        match self {
            PreferredPeriod::None => None,
            PreferredPeriod::Morning => Some((9, 12)),
            PreferredPeriod::Afternoon => Some((14, 17)),
            PreferredPeriod::Evening => Some((18, 21)),
        }
    }
}

impl std::str::FromStr for PreferredPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PreferredPeriod::None),
            "morning" => Ok(PreferredPeriod::Morning),
            "afternoon" => Ok(PreferredPeriod::Afternoon),
            "evening" => Ok(PreferredPeriod::Evening),
            other => Err(format!("unknown focus period: {other}")),
        }
    }
}

/// Focus-slot search window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default = "default_work_start")]
    pub work_start: String,
    #[serde(default = "default_work_end")]
    pub work_end: String,
    #[serde(default = "default_min_block")]
    pub min_block_minutes: i64,
    #[serde(default = "default_true")]
    pub travel_counts_as_busy: bool,
    #[serde(default)]
    pub preferred_period: PreferredPeriod,
}

/// Travel estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelConfig {
    #[serde(default)]
    pub default_mode: TransportMode,
    /// Distance Matrix API key. Empty means offline estimation only.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

/// Background travel recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub use_network: bool,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// IANA zone in which calendar days are computed.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default)]
    pub overload: OverloadConfig,
    #[serde(default)]
    pub focus: FocusConfig,
    #[serde(default)]
    pub travel: TravelConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

// Default functions
fn default_time_zone() -> String {
    "UTC".into()
}
fn default_daily_budget() -> i64 {
    480
}
fn default_work_start() -> String {
    "08:00".into()
}
fn default_work_end() -> String {
    "18:00".into()
}
fn default_min_block() -> i64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    200
}
fn default_interval_secs() -> u64 {
    900
}

impl Default for OverloadConfig {
    fn default() -> Self {
        Self {
            daily_budget_minutes: default_daily_budget(),
            max_events_per_day: 0,
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            work_start: default_work_start(),
            work_end: default_work_end(),
            min_block_minutes: default_min_block(),
            travel_counts_as_busy: true,
            preferred_period: PreferredPeriod::None,
        }
    }
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            default_mode: TransportMode::Driving,
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            use_network: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            overload: OverloadConfig::default(),
            focus: FocusConfig::default(),
            travel: TravelConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("'{value}' is not HH:MM ({e})"),
    })
}

impl FocusConfig {
    /// Working window as local wall-clock times.
    pub fn work_hours(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let start = parse_clock("focus.work_start", &self.work_start)?;
        let end = parse_clock("focus.work_end", &self.work_end)?;
        if end <= start {
            return Err(ConfigError::InvalidValue {
                key: "focus.work_end".into(),
                message: format!("{} must be after {}", self.work_end, self.work_start),
            });
        }
        Ok((start, end))
    }
}

impl TravelConfig {
    /// Configured key, falling back to `DAYWEAVE_MAPS_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("cannot parse '{value}' as bool: {e}")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".into()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// validated, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the result does not validate.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Set a value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        self.focus.work_hours()?;
        if self.overload.daily_budget_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "overload.daily_budget_minutes".into(),
                message: "must be positive".into(),
            });
        }
        if self.focus.min_block_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "focus.min_block_minutes".into(),
                message: "must be positive".into(),
            });
        }
        if self.reconcile.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reconcile.interval_secs".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "time_zone".into(),
                message: e.to_string(),
            })
    }

    pub fn max_events_per_day(&self) -> Option<usize> {
        match self.overload.max_events_per_day {
            0 => None,
            n => Some(n as usize),
        }
    }
}
