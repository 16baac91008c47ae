//! Timeout and bounded retry around a travel-time calculator.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;

use super::calculator::{Estimate, EstimatorError, TravelTimeCalculator};
use super::TransportMode;
use crate::calendar::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            max_retries: 2,
            backoff_base: Duration::from_millis(200),
        }
    }
}

impl GuardPolicy {
    /// Delay before retry number `attempt` (0-based): exponential plus jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff_base.as_millis() as u64;
        if base == 0 {
            return Duration::ZERO;
        }
        let exp = base.saturating_mul(1u64 << attempt.min(16));
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_millis(exp.saturating_add(jitter))
    }
}

/// Runs each attempt on a worker thread so a hung calculator cannot hold
/// the caller (and the user lock it owns) past `policy.timeout`.
#[derive(Clone)]
pub struct EstimatorGuard {
    inner: Arc<dyn TravelTimeCalculator>,
    policy: GuardPolicy,
}

impl EstimatorGuard {
    pub fn new(inner: Arc<dyn TravelTimeCalculator>, policy: GuardPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    fn attempt(
        &self,
        from: &Location,
        to: &Location,
        mode: TransportMode,
    ) -> Result<Estimate, EstimatorError> {
        let (tx, rx) = mpsc::channel();
        let calculator = Arc::clone(&self.inner);
        let (from, to) = (from.clone(), to.clone());
        thread::Builder::new()
            .name("dayweave-estimator".into())
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = tx.send(calculator.estimate(&from, &to, mode));
            })
            .map_err(|e| EstimatorError::permanent(format!("cannot spawn estimator thread: {e}")))?;

        match rx.recv_timeout(self.policy.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(EstimatorError::transient(format!(
                "{} timed out after {} ms",
                self.inner.name(),
                self.policy.timeout.as_millis()
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EstimatorError::permanent(format!(
                "{} worker exited without a result",
                self.inner.name()
            ))),
        }
    }
}

impl TravelTimeCalculator for EstimatorGuard {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn estimate(
        &self,
        from: &Location,
        to: &Location,
        mode: TransportMode,
    ) -> Result<Estimate, EstimatorError> {
        let mut attempt = 0;
        loop {
            match self.attempt(from, to, mode) {
                Ok(estimate) if estimate.duration_minutes >= 0 => return Ok(estimate),
                Ok(estimate) => {
                    return Err(EstimatorError::permanent(format!(
                        "{} returned a negative duration ({} min)",
                        self.inner.name(),
                        estimate.duration_minutes
                    )))
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        calculator = self.inner.name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "travel estimate failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
