//! Serial termination queue

use focusguard_util::{CooldownTracker, ResourceId};
use std::collections::VecDeque;
use tracing::debug;

/// FIFO of termination requests drained one at a time.
///
/// Consecutive terminations are at least `kill_delay_millis` apart. A request
/// for a resource already requested within `min_interval_millis` is dropped
/// at enqueue time; nothing else is ever dropped.
#[derive(Debug)]
pub struct TerminationQueue {
    pending: VecDeque<ResourceId>,
    recent: CooldownTracker<ResourceId>,
    kill_delay_millis: i64,
    next_allowed_at: Option<i64>,
}

impl TerminationQueue {
    pub fn new(kill_delay_millis: i64, min_interval_millis: i64) -> Self {
        Self {
            pending: VecDeque::new(),
            recent: CooldownTracker::new(min_interval_millis),
            kill_delay_millis,
            next_allowed_at: None,
        }
    }

    /// Queue a termination. Returns false if it was deduplicated.
    pub fn enqueue(&mut self, resource: ResourceId, now_millis: i64) -> bool {
        if !self.recent.check(resource.clone(), now_millis) {
            debug!(resource = %resource, "Termination already requested recently");
            return false;
        }
        self.pending.push_back(resource);
        true
    }

    /// Take the next termination if the inter-kill delay has elapsed
    pub fn pop_due(&mut self, now_millis: i64) -> Option<ResourceId> {
        if self.next_allowed_at.is_some_and(|at| now_millis < at) {
            return None;
        }
        let resource = self.pending.pop_front()?;
        self.next_allowed_at = Some(now_millis + self.kill_delay_millis);
        self.recent.cleanup(now_millis);
        Some(resource)
    }

    /// When [`Self::pop_due`] will next yield, if anything is queued
    pub fn next_due(&self, now_millis: i64) -> Option<i64> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.next_allowed_at.map_or(now_millis, |at| at.max(now_millis)))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
