//! Periodic housekeeping

use focusguard_store::{BlockRepository, StoreResult};
use tracing::{debug, info};

use crate::EvaluationScheduler;

/// Outcome of one housekeeping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorReport {
    pub expired_bypasses: usize,
    pub expired_timers: usize,
    pub active_timers: usize,
    pub next_evaluation: Option<i64>,
}

/// Prunes expired state and keeps the evaluation wake-up armed.
///
/// Runs once at startup and then on a fixed interval, independent of the
/// wake-ups the scheduler arms.
pub struct Monitor {
    repository: BlockRepository,
    scheduler: EvaluationScheduler,
}

impl Monitor {
    pub fn new(repository: BlockRepository, scheduler: EvaluationScheduler) -> Self {
        Self {
            repository,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &EvaluationScheduler {
        &self.scheduler
    }

    pub fn run_once(&self, now_millis: i64) -> StoreResult<MonitorReport> {
        let expired_bypasses = self.repository.clear_expired_bypasses(now_millis)?;
        let expired_timers = self.repository.clear_expired_timers(now_millis)?;
        let active_timers = self.repository.active_timers(now_millis)?.len();
        let next_evaluation = self.scheduler.reschedule(now_millis)?;

        let report = MonitorReport {
            expired_bypasses,
            expired_timers,
            active_timers,
            next_evaluation,
        };
        if expired_bypasses > 0 || expired_timers > 0 {
            info!(
                expired_bypasses,
                expired_timers, active_timers, "Housekeeping removed expired state"
            );
        } else {
            debug!(active_timers, next_eval = ?next_evaluation, "Housekeeping pass");
        }
        Ok(report)
    }
}
