use clap::Subcommand;
use dayweave_core::calendar::UserId;
use dayweave_core::storage::PreferredPeriod;
use dayweave_core::FocusPreference;

use super::{open_planner, print_json, CmdResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user
    Create {
        /// Display name
        name: String,
    },
    /// List users
    List,
    /// Show or change a user's focus preferences
    Prefs {
        /// User ID
        user: UserId,
        /// Shortest gap offered as a focus slot, in minutes
        #[arg(long)]
        min_focus: Option<i64>,
        /// Events allowed per day (0 = no cap)
        #[arg(long)]
        max_events: Option<u32>,
        /// Preferred focus period (none, morning, afternoon, evening)
        #[arg(long)]
        period: Option<PreferredPeriod>,
        /// Drop every override and fall back to the configuration
        #[arg(long, conflicts_with_all = ["min_focus", "max_events", "period"])]
        reset: bool,
    },
}

pub fn run(action: UserAction) -> CmdResult {
    let planner = open_planner()?;
    match action {
        UserAction::Create { name } => print_json(&planner.create_user(&name)?),
        UserAction::List => print_json(&planner.list_users()?),
        UserAction::Prefs {
            user,
            min_focus,
            max_events,
            period,
            reset,
        } => {
            let mut pref = planner.preference(user)?;
            if reset {
                pref = FocusPreference::new(user);
            } else if min_focus.is_none() && max_events.is_none() && period.is_none() {
                return print_json(&pref);
            }
            pref.min_focus_minutes = min_focus.or(pref.min_focus_minutes);
            pref.max_events_per_day = max_events.or(pref.max_events_per_day);
            pref.preferred_period = period.or(pref.preferred_period);
            print_json(&planner.set_preference(pref)?)
        }
    }
}
