//! One-shot wake-up on the tokio timer

use focusguard_host_api::WakeScheduler;
use focusguard_util::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Pending {
    at_millis: i64,
    task: JoinHandle<()>,
}

/// Sends the armed instant on a channel when it is reached. Arming again
/// aborts the pending task first.
pub struct TokioWakeScheduler {
    clock: Arc<dyn Clock>,
    tx: mpsc::UnboundedSender<i64>,
    pending: Mutex<Option<Pending>>,
}

impl TokioWakeScheduler {
    pub fn new(clock: Arc<dyn Clock>, tx: mpsc::UnboundedSender<i64>) -> Self {
        Self {
            clock,
            tx,
            pending: Mutex::new(None),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WakeScheduler for TokioWakeScheduler {
    fn arm(&self, at_millis: i64) {
        let delay = (at_millis - self.clock.now_millis()).max(0) as u64;
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let _ = tx.send(at_millis);
        });

        if let Some(previous) = self.pending().replace(Pending { at_millis, task }) {
            previous.task.abort();
        }
    }

    fn cancel(&self) {
        if let Some(previous) = self.pending().take() {
            previous.task.abort();
        }
    }

    fn armed_at(&self) -> Option<i64> {
        self.pending()
            .as_ref()
            .filter(|p| !p.task.is_finished())
            .map(|p| p.at_millis)
    }
}

impl Drop for TokioWakeScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
