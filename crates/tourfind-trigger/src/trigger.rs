//! Retry state machine.
//!
//! `Idle -> Attempting -> {Succeeded | Retrying -> Attempting | Failed}`.
//! The first attempt waits for the configured initial delay; every failed
//! attempt but the last waits `min(base * 1.5^n, max)` before the next one.
//! Cancellation is observed at every wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tourfind_core::config::TriggerConfig;
use tourfind_core::TourHandle;

use crate::locate::{activate, locate, ActivationMethod, LookupStrategy};

const BACKOFF_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Attempting { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStatus {
    Success { lookup: LookupStrategy, method: ActivationMethod },
    /// Every attempt failed to find or activate the element.
    Exhausted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub status: TriggerStatus,
    pub attempts: u32,
    /// Waits between attempts, initial delay excluded.
    pub delays: Vec<Duration>,
}

impl TriggerOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, TriggerStatus::Success { .. })
    }
}

/// Delay after failed attempt `n` (0-based).
pub fn backoff_delay(options: &TriggerConfig, n: u32) -> Duration {
    let factor = BACKOFF_FACTOR.powi(i32::try_from(n).unwrap_or(i32::MAX));
    let scaled = (options.base_interval().as_millis() as f64 * factor).round();
    Duration::from_millis(scaled as u64).min(options.max_interval())
}

#[derive(Clone)]
pub struct ElementTrigger {
    tour: Arc<dyn TourHandle>,
    options: TriggerConfig,
}

/// Handle on a spawned trigger.
pub struct TriggerHandle {
    cancel: CancellationToken,
    join: JoinHandle<TriggerOutcome>,
}

impl TriggerHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the trigger to settle. `None` if the task panicked or was
    /// aborted.
    pub async fn wait(self) -> Option<TriggerOutcome> {
        self.join.await.ok()
    }
}

impl ElementTrigger {
    pub fn new(tour: Arc<dyn TourHandle>, options: TriggerConfig) -> Self {
        Self { tour, options }
    }

    /// Run the trigger on a background task. `on_complete` receives whether
    /// the element was activated; it is not called when the trigger is
    /// cancelled first.
    pub fn spawn<F>(&self, element_id: impl Into<String>, on_complete: F) -> TriggerHandle
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let trigger = self.clone();
        let element_id = element_id.into();
        let join = tokio::spawn(async move {
            let outcome = trigger.run(&element_id, &token).await;
            if outcome.status != TriggerStatus::Cancelled {
                on_complete(outcome.succeeded());
            }
            outcome
        });
        TriggerHandle { cancel, join }
    }

    pub async fn run(&self, element_id: &str, cancel: &CancellationToken) -> TriggerOutcome {
        let max_attempts = self.options.max_retries.max(1);
        let mut delays = Vec::new();
        let mut attempts = 0;
        debug!(element_id, state = ?TriggerState::Idle, "trigger scheduled");

        if !wait(self.options.initial_delay(), cancel).await {
            return cancelled(attempts, delays);
        }

        while attempts < max_attempts {
            attempts += 1;
            let state = TriggerState::Attempting { attempt: attempts };
            debug!(element_id, ?state, "looking up element");
            if let Some(status) = self.attempt(element_id) {
                info!(element_id, attempts, ?status, state = ?TriggerState::Succeeded, "element triggered");
                return TriggerOutcome { status, attempts, delays };
            }
            if attempts == max_attempts {
                break;
            }
            let delay = backoff_delay(&self.options, attempts - 1);
            let state = TriggerState::Retrying { attempt: attempts, delay };
            debug!(element_id, ?state, "retrying");
            delays.push(delay);
            if !wait(delay, cancel).await {
                return cancelled(attempts, delays);
            }
        }

        warn!(element_id, attempts, state = ?TriggerState::Failed, "element could not be triggered");
        TriggerOutcome { status: TriggerStatus::Exhausted, attempts, delays }
    }

    fn attempt(&self, element_id: &str) -> Option<TriggerStatus> {
        let (lookup, element) = locate(self.tour.as_ref(), element_id)?;
        let method = activate(element.as_ref())?;
        Some(TriggerStatus::Success { lookup, method })
    }
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
async fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = sleep(delay) => true,
    }
}

fn cancelled(attempts: u32, delays: Vec<Duration>) -> TriggerOutcome {
    debug!(attempts, "trigger cancelled");
    TriggerOutcome { status: TriggerStatus::Cancelled, attempts, delays }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_by_half_and_caps() {
        let options = TriggerConfig::default();
        let delays: Vec<u64> = (0..4).map(|n| backoff_delay(&options, n).as_millis() as u64).collect();
        assert_eq!(delays, vec![300, 450, 675, 1000]);
    }
}
