//! Scheduling bridge between the decision engine and a one-shot wake-up

use focusguard_host_api::WakeScheduler;
use focusguard_store::{BlockRepository, StoreResult};
use focusguard_util::format_millis;
use std::sync::Arc;
use tracing::{debug, info};

use crate::DecisionEngine;

/// Keeps exactly one wake-up armed at the next instant any rule or bypass
/// changes state
pub struct EvaluationScheduler {
    repository: BlockRepository,
    wake: Arc<dyn WakeScheduler>,
}

impl EvaluationScheduler {
    pub fn new(repository: BlockRepository, wake: Arc<dyn WakeScheduler>) -> Self {
        Self { repository, wake }
    }

    /// Recompute the snapshot-wide next evaluation and re-arm. Called at
    /// startup, on every wake-up and after any policy change.
    pub fn reschedule(&self, now_millis: i64) -> StoreResult<Option<i64>> {
        let snapshot = self.repository.snapshot()?;
        let next = DecisionEngine::next_wake_time(
            now_millis,
            &snapshot.block_rules,
            &snapshot.bypasses,
        );
        self.arm(next, now_millis);
        Ok(next)
    }

    /// Arm `next`, replacing any pending wake-up. `None` or an instant not
    /// in the future leaves nothing armed.
    pub fn arm(&self, next: Option<i64>, now_millis: i64) {
        match next {
            Some(at) if at > now_millis => {
                if self.wake.armed_at() != Some(at) {
                    info!(at = %format_millis(at), "Next evaluation scheduled");
                }
                self.wake.arm(at);
            }
            Some(at) => {
                debug!(at, now_millis, "Next evaluation not in the future, not arming");
                self.wake.cancel();
            }
            None => {
                debug!("No upcoming rule changes, wake-up cancelled");
                self.wake.cancel();
            }
        }
    }

    pub fn armed_at(&self) -> Option<i64> {
        self.wake.armed_at()
    }
}
