//! Periodic travel-segment reconciliation.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Planner;
use crate::calendar::UserId;
use crate::error::Result;

/// Result of one pass over every user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub users: usize,
    pub succeeded: usize,
    pub failed: Vec<(UserId, String)>,
}

pub struct ReconcileLoop;

impl ReconcileLoop {
    /// Recalculate every user's segments once. A failing user is logged and
    /// skipped.
    pub fn run_once(planner: &Planner) -> Result<ReconcileSummary> {
        let use_network = planner.config().reconcile.use_network;
        let users = planner.list_users()?;
        let mut summary = ReconcileSummary {
            users: users.len(),
            ..Default::default()
        };
        for user in users {
            match planner.recalculate_all(user.id, use_network) {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    tracing::warn!(user_id = user.id, error = %e, "reconcile failed for user");
                    summary.failed.push((user.id, e.to_string()));
                }
            }
        }
        tracing::info!(
            users = summary.users,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "reconcile pass finished"
        );
        Ok(summary)
    }

    /// Run [`ReconcileLoop::run_once`] now and then every `interval` on a
    /// background thread until the handle is stopped or dropped.
    pub fn spawn(planner: Arc<Planner>, interval: Duration) -> ReconcileHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::spawn(move || loop {
            if let Err(e) = Self::run_once(&planner) {
                tracing::warn!(error = %e, "reconcile pass failed");
            }
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        ReconcileHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// Owner of a running reconcile thread.
pub struct ReconcileHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReconcileHandle {
    /// Signal the thread and wait for the current pass to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("reconcile thread panicked");
            }
        }
    }
}

impl Drop for ReconcileHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Location, NewEvent};
    use crate::storage::{CalendarStore, Config, SqliteStore};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap()
    }

    fn seeded() -> (Arc<SqliteStore>, Arc<Planner>) {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let planner = Planner::new(store.clone(), Config::default()).unwrap();
        let here = Location::from_coordinates(48.85, 2.35).unwrap();
        for name in ["ada", "grace"] {
            let user = planner.create_user(name).unwrap();
            // Raw inserts leave the segments for the loop to derive.
            store
                .insert_event(&NewEvent::new(user.id, "A", at(9), at(10)).with_location(here.clone()), None)
                .unwrap();
            store
                .insert_event(&NewEvent::new(user.id, "B", at(11), at(12)).with_location(here.clone()), None)
                .unwrap();
        }
        (store, Arc::new(planner))
    }

    #[test]
    fn run_once_covers_every_user() {
        let (store, planner) = seeded();
        let summary = ReconcileLoop::run_once(&planner).unwrap();
        assert_eq!(summary.users, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(summary.failed.is_empty());
        for user in store.list_users().unwrap() {
            assert_eq!(store.segments_for_user(user.id).unwrap().len(), 1);
        }
    }

    #[test]
    fn spawned_loop_runs_immediately_and_stops() {
        let (store, planner) = seeded();
        let handle = ReconcileLoop::spawn(planner, Duration::from_secs(3600));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let done = || {
            store
                .list_users()
                .unwrap()
                .iter()
                .all(|u| !store.segments_for_user(u.id).unwrap().is_empty())
        };
        while !done() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.stop();
        assert!(done());
    }
}
