//! Per-user focus and overload preferences.

use serde::{Deserialize, Serialize};

use super::UserId;
use crate::error::ValidationError;
use crate::storage::{Config, PreferredPeriod};

/// A user's overrides of the `[focus]` and `[overload]` settings.
///
/// Every `None` field falls back to the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPreference {
    pub user_id: UserId,
    pub min_focus_minutes: Option<i64>,
    /// `Some(0)` lifts the configured cap for this user.
    pub max_events_per_day: Option<u32>,
    pub preferred_period: Option<PreferredPeriod>,
}

impl FocusPreference {
    /// No overrides.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            min_focus_minutes: None,
            max_events_per_day: None,
            preferred_period: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_focus_minutes.is_none()
            && self.max_events_per_day.is_none()
            && self.preferred_period.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.min_focus_minutes {
            Some(minutes) if minutes <= 0 => Err(ValidationError::invalid(
                "min_focus_minutes",
                format!("must be positive, got {minutes}"),
            )),
            _ => Ok(()),
        }
    }

    pub fn min_focus_minutes(&self, config: &Config) -> i64 {
        self.min_focus_minutes.unwrap_or(config.focus.min_block_minutes)
    }

    pub fn max_events_per_day(&self, config: &Config) -> Option<usize> {
        match self.max_events_per_day {
            Some(0) => None,
            Some(n) => Some(n as usize),
            None => config.max_events_per_day(),
        }
    }

    pub fn preferred_period(&self, config: &Config) -> PreferredPeriod {
        self.preferred_period.unwrap_or(config.focus.preferred_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_fall_back_to_config() {
        let mut config = Config::default();
        config.overload.max_events_per_day = 4;
        config.focus.preferred_period = PreferredPeriod::Morning;

        let pref = FocusPreference::new(1);
        assert!(pref.is_empty());
        assert_eq!(pref.min_focus_minutes(&config), 60);
        assert_eq!(pref.max_events_per_day(&config), Some(4));
        assert_eq!(pref.preferred_period(&config), PreferredPeriod::Morning);
    }

    #[test]
    fn overrides_win() {
        let mut config = Config::default();
        config.overload.max_events_per_day = 4;
        let pref = FocusPreference {
            user_id: 1,
            min_focus_minutes: Some(30),
            max_events_per_day: Some(0),
            preferred_period: Some(PreferredPeriod::Evening),
        };
        assert_eq!(pref.min_focus_minutes(&config), 30);
        assert_eq!(pref.max_events_per_day(&config), None);
        assert_eq!(pref.preferred_period(&config), PreferredPeriod::Evening);
    }

    #[test]
    fn non_positive_focus_minimum_is_rejected() {
        let mut pref = FocusPreference::new(1);
        pref.min_focus_minutes = Some(0);
        assert!(pref.validate().is_err());
    }
}
