use dayweave_core::calendar::EventId;

use super::{open_planner, print_json, CmdResult};

/// Cancel an event and fill its window with a backlog task.
pub fn run(event: EventId) -> CmdResult {
    let planner = open_planner()?;
    print_json(&planner.reshuffle(event)?)
}
