//! Enforcement state machine
//!
//! Consumes foreground events one at a time and turns verdicts into
//! [`EnforcementAction`]s. It never performs I/O against the host itself; the
//! caller executes the returned actions and calls [`Enforcer::tick`] at
//! [`Enforcer::next_deadline`] so delayed steps (go home, termination, overlay
//! dismissal) fire on time.

use focusguard_config::EnforcementConfig;
use focusguard_host_api::{HostCapabilities, HostEvent};
use focusguard_model::{ActiveTimer, DecisionResult};
use focusguard_store::{BlockRepository, Snapshot, StoreError, StoreResult};
use focusguard_util::{BypassId, CooldownTracker, ResourceId};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

use crate::{DecisionEngine, EnforcementAction, OverlayKind, TerminationQueue};

/// Per-stream enforcement session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing enforced since startup
    #[default]
    Idle,
    /// Home screen seen; nothing enforced since
    Suppressed,
    /// A block fired. With `after_home`, it fired after a home event and
    /// further events are ignored until the next home event.
    Enforced { after_home: bool },
}

/// How a foreground resource is treated, in precedence order
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// An active bypass allows the resource
    Bypassed(BypassId),
    /// An active countdown timer blocks the resource
    TimerBlock(ActiveTimer),
    /// The decision engine ran over the rules
    Rules(DecisionResult),
}

impl Verdict {
    pub fn is_block(&self) -> bool {
        match self {
            Verdict::Bypassed(_) => false,
            Verdict::TimerBlock(_) => true,
            Verdict::Rules(result) => result.is_block(),
        }
    }
}

/// Resolve `resource` against a snapshot: bypass, then timers, then rules.
/// Has no side effects; timer consumption is up to the caller.
pub fn resolve(resource: &str, now_millis: i64, snapshot: &Snapshot) -> Verdict {
    if let Some(bypass) = snapshot
        .bypasses
        .iter()
        .find(|b| b.covers(resource) && b.is_active(now_millis))
    {
        return Verdict::Bypassed(bypass.id().clone());
    }

    if let Some(timer) = snapshot
        .active_timers
        .iter()
        .find(|t| t.is_active(now_millis) && t.blocks(resource))
    {
        return Verdict::TimerBlock(timer.clone());
    }

    Verdict::Rules(DecisionEngine::evaluate(
        resource,
        now_millis,
        &snapshot.block_rules,
        &snapshot.bypasses,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayState {
    Hidden,
    Block { hide_at: i64 },
    Pomodoro,
}

#[derive(Debug)]
struct PendingHome {
    due_at: i64,
    resource: ResourceId,
}

/// The enforcement state machine for one foreground event stream
pub struct Enforcer {
    repository: BlockRepository,
    config: EnforcementConfig,
    capabilities: HostCapabilities,
    state: SessionState,
    overlay: OverlayState,
    last_blocked: Option<ResourceId>,
    cooldown: CooldownTracker<ResourceId>,
    pending_home: VecDeque<PendingHome>,
    terminations: TerminationQueue,
}

impl Enforcer {
    pub fn new(
        repository: BlockRepository,
        config: EnforcementConfig,
        capabilities: HostCapabilities,
    ) -> Self {
        info!(
            can_draw_overlay = capabilities.can_draw_overlay,
            can_go_home = capabilities.can_go_home,
            can_terminate = capabilities.can_terminate,
            "Enforcer initialized"
        );
        if !capabilities.can_enforce() {
            warn!("Host cannot enforce blocks; verdicts will only be logged");
        }

        Self {
            cooldown: CooldownTracker::new(config.cooldown_millis),
            terminations: TerminationQueue::new(
                config.kill_delay_millis,
                config.min_kill_interval_millis,
            ),
            repository,
            config,
            capabilities,
            state: SessionState::Idle,
            overlay: OverlayState::Hidden,
            last_blocked: None,
            pending_home: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The resource most recently blocked, cleared by a bypass allow
    pub fn last_blocked(&self) -> Option<&ResourceId> {
        self.last_blocked.as_ref()
    }

    pub fn is_overlay_showing(&self) -> bool {
        self.overlay != OverlayState::Hidden
    }

    pub fn pending_terminations(&self) -> usize {
        self.terminations.len()
    }

    pub fn handle_event(&mut self, event: &HostEvent) -> Vec<EnforcementAction> {
        match event {
            HostEvent::Foreground {
                resource,
                at_millis,
            } => self.handle_foreground(resource, *at_millis),
            HostEvent::Home { at_millis } => self.handle_home(*at_millis),
            HostEvent::Closed => Vec::new(),
        }
    }

    /// A resource came to the foreground
    pub fn handle_foreground(&mut self, resource: &ResourceId, now_millis: i64) -> Vec<EnforcementAction> {
        let mut actions = self.tick(now_millis);

        if self.config.is_home(resource.as_str()) {
            actions.extend(self.handle_home(now_millis));
            return actions;
        }
        if self.config.is_ignored(resource.as_str()) {
            debug!(resource = %resource, "Ignoring system resource");
            return actions;
        }
        if self.state == (SessionState::Enforced { after_home: true }) {
            debug!(resource = %resource, "Suppression active, skipping enforcement");
            return actions;
        }

        let snapshot = match self.repository.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                report_store_error(&e);
                return actions;
            }
        };

        self.enforce(resource, now_millis, &snapshot, &mut actions);
        self.manage_pomodoro_overlay(now_millis, &snapshot, &mut actions);
        actions
    }

    /// The home screen came to the foreground
    pub fn handle_home(&mut self, now_millis: i64) -> Vec<EnforcementAction> {
        let actions = self.tick(now_millis);
        if self.state != SessionState::Suppressed {
            debug!(previous = ?self.state, "Home detected, suppressing");
        }
        self.state = SessionState::Suppressed;
        actions
    }

    /// Fire everything due at `now_millis`: overlay dismissal, go-home and
    /// at most one termination.
    pub fn tick(&mut self, now_millis: i64) -> Vec<EnforcementAction> {
        let mut actions = Vec::new();

        if let OverlayState::Block { hide_at } = self.overlay {
            if now_millis >= hide_at {
                debug!("Overlay timeout, hiding");
                self.overlay = OverlayState::Hidden;
                actions.push(EnforcementAction::HideOverlay);
            }
        }

        while self
            .pending_home
            .front()
            .is_some_and(|p| p.due_at <= now_millis)
        {
            let Some(pending) = self.pending_home.pop_front() else {
                break;
            };
            if self.capabilities.can_go_home {
                actions.push(EnforcementAction::SendHome {
                    resource: pending.resource.clone(),
                });
            }
            if self.capabilities.can_terminate
                && self.terminations.enqueue(pending.resource.clone(), pending.due_at)
            {
                debug!(resource = %pending.resource, "Termination queued");
            }
        }

        if let Some(resource) = self.terminations.pop_due(now_millis) {
            info!(resource = %resource, "Terminating blocked resource");
            actions.push(EnforcementAction::Terminate { resource });
        }

        self.cooldown.cleanup(now_millis);
        actions
    }

    /// The earliest instant at which [`Self::tick`] has something to do
    pub fn next_deadline(&self, now_millis: i64) -> Option<i64> {
        let overlay = match self.overlay {
            OverlayState::Block { hide_at } => Some(hide_at),
            _ => None,
        };
        let home = self.pending_home.front().map(|p| p.due_at);
        let kill = self.terminations.next_due(now_millis);

        [overlay, home, kill].into_iter().flatten().min()
    }

    /// The host failed to display the overlay. Later blocks show it afresh.
    pub fn overlay_failed(&mut self) {
        self.overlay = OverlayState::Hidden;
    }

    /// Whether `resource` would be blocked right now. Consumes nothing.
    pub fn is_blocked(&self, resource: &str, now_millis: i64) -> StoreResult<bool> {
        let snapshot = self.repository.snapshot()?;
        Ok(resolve(resource, now_millis, &snapshot).is_block())
    }

    fn enforce(
        &mut self,
        resource: &ResourceId,
        now_millis: i64,
        snapshot: &Snapshot,
        actions: &mut Vec<EnforcementAction>,
    ) {
        if self.cooldown.is_cooling(resource, now_millis) {
            debug!(resource = %resource, "Cooldown active, skipping");
            return;
        }

        match resolve(resource.as_str(), now_millis, snapshot) {
            Verdict::Bypassed(bypass_id) => {
                debug!(resource = %resource, bypass_id = %bypass_id, "Bypass active, allowing");
                self.last_blocked = None;
            }
            Verdict::TimerBlock(timer) => {
                info!(
                    resource = %resource,
                    timer_id = %timer.id(),
                    mode = %timer.mode(),
                    "Timer block, consuming timer"
                );
                match self.repository.clear_active_timer(timer.id()) {
                    Ok(true) => {}
                    Ok(false) => debug!(timer_id = %timer.id(), "Timer already gone"),
                    Err(e) => report_store_error(&e),
                }
                self.block(resource, now_millis, actions);
            }
            Verdict::Rules(result) if result.is_block() => {
                info!(
                    resource = %resource,
                    rule_id = ?result.blocking_rule(),
                    next_eval = ?result.next_evaluation_time(),
                    "Rule block"
                );
                self.block(resource, now_millis, actions);
            }
            Verdict::Rules(_) => {
                debug!(resource = %resource, "Allowed");
            }
        }
    }

    fn block(&mut self, resource: &ResourceId, now_millis: i64, actions: &mut Vec<EnforcementAction>) {
        self.cooldown.mark(resource.clone(), now_millis);
        self.last_blocked = Some(resource.clone());
        self.state = match self.state {
            SessionState::Suppressed => SessionState::Enforced { after_home: true },
            _ => SessionState::Enforced { after_home: false },
        };

        if self.capabilities.can_draw_overlay {
            let message = self.config.block_message.clone();
            let action = if self.overlay == OverlayState::Hidden {
                EnforcementAction::ShowOverlay {
                    kind: OverlayKind::Block,
                    message,
                }
            } else {
                EnforcementAction::UpdateOverlay {
                    kind: OverlayKind::Block,
                    message,
                }
            };
            actions.push(action);
            self.overlay = OverlayState::Block {
                hide_at: now_millis + self.config.overlay_timeout_millis,
            };
        } else {
            debug!(resource = %resource, "Overlay not permitted, skipping to home");
        }

        self.pending_home.push_back(PendingHome {
            due_at: now_millis + self.config.home_delay_millis,
            resource: resource.clone(),
        });
    }

    fn manage_pomodoro_overlay(
        &mut self,
        now_millis: i64,
        snapshot: &Snapshot,
        actions: &mut Vec<EnforcementAction>,
    ) {
        let pomodoro_active = snapshot
            .active_timers
            .iter()
            .any(|t| t.is_pomodoro() && t.is_active(now_millis));

        match self.overlay {
            OverlayState::Hidden
                if pomodoro_active
                    && self.state != SessionState::Suppressed
                    && self.capabilities.can_draw_overlay =>
            {
                debug!("Pomodoro timer active, showing overlay");
                actions.push(EnforcementAction::ShowOverlay {
                    kind: OverlayKind::Pomodoro,
                    message: self.config.pomodoro_message.clone(),
                });
                self.overlay = OverlayState::Pomodoro;
            }
            OverlayState::Pomodoro if !pomodoro_active => {
                debug!("No pomodoro timer left, hiding overlay");
                actions.push(EnforcementAction::HideOverlay);
                self.overlay = OverlayState::Hidden;
            }
            _ => {}
        }
    }
}

fn report_store_error(e: &StoreError) {
    match e {
        StoreError::Corrupted { .. } => error!(error = %e, "Block store is corrupted"),
        _ => warn!(error = %e, "Failed to access block store"),
    }
}
