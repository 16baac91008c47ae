use dayweave_core::calendar::UserId;

use super::{open_planner, parse_date, print_json, CmdResult};

/// Print ranked focus slots for `user` on `date` (default today).
pub fn run(user: UserId, date: Option<String>) -> CmdResult {
    let planner = open_planner()?;
    let date = parse_date(date.as_deref(), planner.time_zone())?;
    print_json(&planner.find_focus_slots(user, date)?)
}
