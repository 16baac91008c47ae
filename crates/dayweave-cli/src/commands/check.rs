use dayweave_core::calendar::UserId;

use super::{open_planner, print_json, CmdResult};

/// Print timeline violations; fails when there are any.
pub fn run(user: UserId) -> CmdResult {
    let planner = open_planner()?;
    let violations = planner.check_timeline(user)?;
    print_json(&violations)?;
    if !violations.is_empty() {
        for v in &violations {
            eprintln!("  {v}");
        }
        return Err(format!("{} timeline violation(s)", violations.len()).into());
    }
    Ok(())
}
