use dayweave_core::calendar::UserId;

use super::{open_planner, parse_date, print_json, CmdResult};

/// Print the committed load of `user` on `date` (default today).
pub fn run(user: UserId, date: Option<String>) -> CmdResult {
    let planner = open_planner()?;
    let date = parse_date(date.as_deref(), planner.time_zone())?;
    let load = planner.day_load(user, date)?;
    let json = serde_json::json!({
        "date": load.date,
        "committed_minutes": load.committed_minutes,
        "budget_minutes": load.budget_minutes,
        "remaining_minutes": load.remaining_minutes(),
        "event_count": load.event_count,
        "overloaded": planner.validate_not_overloaded(user, planner.day_window(date).0).is_err(),
    });
    print_json(&json)
}
