use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use dayweave_core::ReconcileLoop;

use super::{open_planner, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ReconcileAction {
    /// Recalculate every user's segments once
    Once,
    /// Keep recalculating in the foreground
    Watch {
        /// Seconds between passes (default: reconcile.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },
}

pub fn run(action: ReconcileAction) -> CmdResult {
    let planner = open_planner()?;

    match action {
        ReconcileAction::Once => print_json(&ReconcileLoop::run_once(&planner)?),
        ReconcileAction::Watch { interval } => {
            let secs = interval.unwrap_or(planner.config().reconcile.interval_secs);
            if secs == 0 {
                return Err("interval must be positive".into());
            }
            tracing::info!(interval_secs = secs, "reconcile loop started");
            let _handle = ReconcileLoop::spawn(Arc::new(planner), Duration::from_secs(secs));
            loop {
                std::thread::park();
            }
        }
    }
}
