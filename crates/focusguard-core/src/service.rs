//! Policy operations offered to the control surface

use focusguard_config::{BypassConfig, parse_rule_batch};
use focusguard_model::{ActiveTimer, BypassRule, TimerMode};
use focusguard_store::BlockRepository;
use focusguard_util::{BypassId, ResourceId, Result, TimerId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A running timer as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub id: TimerId,
    pub mode: TimerMode,
    pub start_time_millis: i64,
    pub duration_minutes: u32,
    pub blocked_packages: Vec<ResourceId>,
    pub remaining_seconds: i64,
}

impl TimerView {
    fn new(timer: &ActiveTimer, now_millis: i64) -> Self {
        Self {
            id: timer.id().clone(),
            mode: timer.mode(),
            start_time_millis: timer.start_time_millis(),
            duration_minutes: timer.duration_minutes(),
            blocked_packages: timer.blocked_packages().to_vec(),
            remaining_seconds: timer.remaining_seconds(now_millis),
        }
    }
}

/// Summary of what is blocked right now
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub is_block_active: bool,
    pub blocked_resources: BTreeSet<ResourceId>,
    pub bypass_active: bool,
}

/// Rule, bypass and timer management
#[derive(Clone)]
pub struct PolicyService {
    repository: BlockRepository,
    bypass: BypassConfig,
}

impl PolicyService {
    pub fn new(repository: BlockRepository, bypass: BypassConfig) -> Self {
        Self { repository, bypass }
    }

    pub fn repository(&self) -> &BlockRepository {
        &self.repository
    }

    /// Replace all rules with the batch in `json`.
    ///
    /// Refused while an existing rule is in its window or a bypass is
    /// running, and when `json` is not a rule array. Individual bad entries
    /// are dropped from the batch.
    pub fn save_block_rules_json(&self, json: &str, now_millis: i64) -> Result<bool> {
        let rules = match parse_rule_batch(json) {
            Ok(rules) => rules,
            Err(e) => {
                warn!(error = %e, "Rejected rule submission");
                return Ok(false);
            }
        };

        let count = rules.len();
        if !self.repository.replace_block_rules_if_unlocked(rules, now_millis)? {
            info!("Rule change refused while a block is running");
            return Ok(false);
        }
        info!(count, "Saved block rules");
        Ok(true)
    }

    /// Grant a bypass of the configured duration for `resource` (`*` for
    /// everything). Refused for a blank resource or while another bypass is
    /// active.
    pub fn grant_emergency_bypass(&self, resource: &str, now_millis: i64) -> Result<Option<BypassRule>> {
        if resource.trim().is_empty() {
            debug!("Bypass refused: blank resource");
            return Ok(None);
        }

        let bypass = BypassRule::new(
            BypassId::generate(),
            ResourceId::from(resource),
            now_millis,
            self.bypass.duration_millis,
        )?;

        if !self.repository.grant_bypass(bypass.clone(), now_millis)? {
            info!(resource, "Bypass refused: another bypass is active");
            return Ok(None);
        }

        info!(
            resource,
            bypass_id = %bypass.id(),
            duration_ms = bypass.duration_millis(),
            "Emergency bypass granted"
        );
        Ok(Some(bypass))
    }

    pub fn start_focus_timer(
        &self,
        duration_minutes: i64,
        resources: Vec<ResourceId>,
        now_millis: i64,
    ) -> Result<Option<ActiveTimer>> {
        self.start_blocking_timer(duration_minutes, resources, now_millis)
    }

    /// Same as [`Self::start_focus_timer`]; kept apart for callers that
    /// distinguish preset and custom durations
    pub fn start_custom_timer(
        &self,
        duration_minutes: i64,
        resources: Vec<ResourceId>,
        now_millis: i64,
    ) -> Result<Option<ActiveTimer>> {
        self.start_blocking_timer(duration_minutes, resources, now_millis)
    }

    pub fn start_pomodoro_focus(&self, duration_minutes: i64, now_millis: i64) -> Result<Option<ActiveTimer>> {
        self.start_timer(duration_minutes, Vec::new(), TimerMode::PomodoroFocus, now_millis)
    }

    pub fn start_pomodoro_break(&self, duration_minutes: i64, now_millis: i64) -> Result<Option<ActiveTimer>> {
        self.start_timer(duration_minutes, Vec::new(), TimerMode::PomodoroBreak, now_millis)
    }

    /// Timers currently enforcing, with time left
    pub fn active_timers(&self, now_millis: i64) -> Result<Vec<TimerView>> {
        Ok(self
            .repository
            .active_timers(now_millis)?
            .iter()
            .map(|t| TimerView::new(t, now_millis))
            .collect())
    }

    /// Prune expired state, then report active windows, timers and bypasses
    pub fn block_status(&self, now_millis: i64) -> Result<BlockStatus> {
        self.repository.clear_expired_bypasses(now_millis)?;
        let timers = self.repository.active_timers(now_millis)?;
        let snapshot = self.repository.snapshot()?;

        let mut blocked_resources: BTreeSet<ResourceId> = snapshot
            .block_rules
            .iter()
            .filter(|r| r.is_active(now_millis))
            .flat_map(|r| r.target_apps().iter().cloned())
            .collect();
        blocked_resources.extend(timers.iter().flat_map(|t| t.blocked_packages().iter().cloned()));

        let rule_active = snapshot.block_rules.iter().any(|r| r.is_active(now_millis));

        Ok(BlockStatus {
            is_block_active: rule_active || !timers.is_empty(),
            blocked_resources,
            bypass_active: snapshot.bypasses.iter().any(|b| b.is_active(now_millis)),
        })
    }

    fn start_blocking_timer(
        &self,
        duration_minutes: i64,
        resources: Vec<ResourceId>,
        now_millis: i64,
    ) -> Result<Option<ActiveTimer>> {
        if resources.is_empty() {
            debug!("Timer refused: no resources to block");
            return Ok(None);
        }
        self.start_timer(duration_minutes, resources, TimerMode::Focus, now_millis)
    }

    fn start_timer(
        &self,
        duration_minutes: i64,
        resources: Vec<ResourceId>,
        mode: TimerMode,
        now_millis: i64,
    ) -> Result<Option<ActiveTimer>> {
        if duration_minutes <= 0 {
            debug!(duration_minutes, "Timer refused: non-positive duration");
            return Ok(None);
        }

        let timer = ActiveTimer::new(TimerId::generate(), now_millis, duration_minutes, resources, mode)?;
        if !self.repository.save_active_timer(timer.clone(), now_millis)? {
            warn!(timer_id = %timer.id(), "Timer id already present");
            return Ok(None);
        }

        info!(
            timer_id = %timer.id(),
            mode = %mode,
            duration_minutes,
            resources = timer.blocked_packages().len(),
            "Timer started"
        );
        Ok(Some(timer))
    }
}
