use clap::Subcommand;
use dayweave_core::calendar::{EventId, UserId};
use dayweave_core::TransportMode;

use super::{open_planner, parse_date, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TravelAction {
    /// Compute and store the segment between two events
    Resolve {
        /// Origin event ID
        from: EventId,
        /// Destination event ID
        to: EventId,
        /// Transport mode (default: destination's preference)
        #[arg(long)]
        mode: Option<TransportMode>,
        /// Use the Distance Matrix API
        #[arg(long)]
        network: bool,
    },
    /// Recompute every segment of a user
    Recalc {
        /// User ID
        user: UserId,
        /// Use the Distance Matrix API
        #[arg(long)]
        network: bool,
    },
    /// List segments on a day
    List {
        /// User ID
        user: UserId,
        /// Day (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
}

pub fn run(action: TravelAction) -> CmdResult {
    let planner = open_planner()?;

    match action {
        TravelAction::Resolve {
            from,
            to,
            mode,
            network,
        } => print_json(&planner.resolve_and_store(from, to, mode, network)?),
        TravelAction::Recalc { user, network } => print_json(&planner.recalculate_all(user, network)?),
        TravelAction::List { user, date } => {
            let date = parse_date(date.as_deref(), planner.time_zone())?;
            print_json(&planner.segments_on_day(user, date)?)
        }
    }
}
