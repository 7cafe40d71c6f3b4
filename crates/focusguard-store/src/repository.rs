//! Typed read-modify-write operations over the snapshot

use focusguard_model::{ActiveTimer, BlockRule, BypassRule};
use focusguard_util::{ResourceId, TimerId};
use std::sync::Arc;
use tracing::debug;

use crate::{Snapshot, Store, StoreResult, dedup_rules};

/// Access to rules, bypasses and timers.
///
/// Every mutation is one [`Store::modify`] call, so concurrent callers never
/// interleave between the read and the write.
#[derive(Clone)]
pub struct BlockRepository {
    store: Arc<dyn Store>,
}

impl BlockRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        self.store.load()
    }

    pub fn block_rules(&self) -> StoreResult<Vec<BlockRule>> {
        Ok(self.store.load()?.block_rules)
    }

    pub fn bypasses(&self) -> StoreResult<Vec<BypassRule>> {
        Ok(self.store.load()?.bypasses)
    }

    /// Replace all block rules. Later rules repeating an id are dropped.
    pub fn save_block_rules(&self, rules: Vec<BlockRule>) -> StoreResult<()> {
        let mut rules = Some(dedup_rules(rules));
        self.store.modify(&mut |s| {
            if let Some(rules) = rules.take() {
                s.block_rules = rules;
            }
        })
    }

    /// Replace all block rules unless stored rules exist and one of them is
    /// in its window or a bypass is running. Returns whether the rules were
    /// replaced.
    pub fn replace_block_rules_if_unlocked(
        &self,
        rules: Vec<BlockRule>,
        now_millis: i64,
    ) -> StoreResult<bool> {
        let mut replaced = false;
        let mut rules = Some(dedup_rules(rules));
        self.store.modify(&mut |s| {
            let rule_active = s.block_rules.iter().any(|r| r.is_active(now_millis));
            let bypass_active = s.bypasses.iter().any(|b| b.is_active(now_millis));
            if !s.block_rules.is_empty() && (rule_active || bypass_active) {
                debug!(rule_active, bypass_active, "Rules locked");
                return;
            }
            if let Some(rules) = rules.take() {
                s.block_rules = rules;
                replaced = true;
            }
        })?;
        Ok(replaced)
    }

    /// Replace all bypasses
    pub fn save_bypasses(&self, bypasses: Vec<BypassRule>) -> StoreResult<()> {
        let mut bypasses = Some(bypasses);
        self.store.modify(&mut |s| {
            if let Some(bypasses) = bypasses.take() {
                s.bypasses = bypasses;
            }
        })
    }

    /// Drop bypasses that have run out. Returns how many were removed.
    pub fn clear_expired_bypasses(&self, now_millis: i64) -> StoreResult<usize> {
        let mut removed = 0;
        self.store.modify(&mut |s| {
            let before = s.bypasses.len();
            s.bypasses.retain(|b| !b.is_expired(now_millis));
            removed = before - s.bypasses.len();
        })?;
        if removed > 0 {
            debug!(removed, "Cleared expired bypasses");
        }
        Ok(removed)
    }

    /// Grant `bypass` unless another bypass is active, pausing the timers it
    /// covers until the bypass expires. Returns whether it was granted.
    pub fn grant_bypass(&self, bypass: BypassRule, now_millis: i64) -> StoreResult<bool> {
        let mut granted = false;
        let mut bypass = Some(bypass);
        self.store.modify(&mut |s| {
            s.bypasses.retain(|b| !b.is_expired(now_millis));
            s.active_timers.retain(|t| !t.is_expired(now_millis));
            if s.bypasses.iter().any(|b| b.is_active(now_millis)) {
                return;
            }
            if let Some(bypass) = bypass.take() {
                pause_matching(
                    &mut s.active_timers,
                    bypass.resource_id(),
                    now_millis,
                    bypass.expires_at_millis(),
                );
                s.bypasses.push(bypass);
                granted = true;
            }
        })?;
        Ok(granted)
    }

    /// Timers currently enforcing: not expired and not paused. Expired timers
    /// are pruned from storage in the same step.
    pub fn active_timers(&self, now_millis: i64) -> StoreResult<Vec<ActiveTimer>> {
        let mut active = Vec::new();
        self.store.modify(&mut |s| {
            s.active_timers.retain(|t| !t.is_expired(now_millis));
            active = s
                .active_timers
                .iter()
                .filter(|t| t.is_active(now_millis))
                .cloned()
                .collect();
        })?;
        Ok(active)
    }

    /// Add a timer. Expired timers are dropped first; a duplicate id is
    /// refused. Several timers may block the same resource.
    pub fn save_active_timer(&self, timer: ActiveTimer, now_millis: i64) -> StoreResult<bool> {
        let mut saved = false;
        let mut timer = Some(timer);
        self.store.modify(&mut |s| {
            s.active_timers.retain(|t| !t.is_expired(now_millis));
            let Some(new) = timer.take() else { return };
            if s.active_timers.iter().any(|t| t.id() == new.id()) {
                return;
            }
            s.active_timers.push(new);
            saved = true;
        })?;
        Ok(saved)
    }

    pub fn clear_expired_timers(&self, now_millis: i64) -> StoreResult<usize> {
        let mut removed = 0;
        self.store.modify(&mut |s| {
            let before = s.active_timers.len();
            s.active_timers.retain(|t| !t.is_expired(now_millis));
            removed = before - s.active_timers.len();
        })?;
        if removed > 0 {
            debug!(removed, "Cleared expired timers");
        }
        Ok(removed)
    }

    pub fn clear_all_active_timers(&self) -> StoreResult<()> {
        self.store.modify(&mut |s| s.active_timers.clear())
    }

    /// Delete one timer; used when a timer is consumed by enforcement
    pub fn clear_active_timer(&self, id: &TimerId) -> StoreResult<bool> {
        let mut removed = false;
        self.store.modify(&mut |s| {
            let before = s.active_timers.len();
            s.active_timers.retain(|t| t.id() != id);
            removed = s.active_timers.len() != before;
        })?;
        Ok(removed)
    }

    /// Replace the stored timer with the same id. Returns false if none matched.
    pub fn update_active_timer(&self, timer: ActiveTimer, now_millis: i64) -> StoreResult<bool> {
        let mut updated = false;
        self.store.modify(&mut |s| {
            s.active_timers.retain(|t| !t.is_expired(now_millis));
            if let Some(slot) = s.active_timers.iter_mut().find(|t| t.id() == timer.id()) {
                *slot = timer.clone();
                updated = true;
            }
        })?;
        Ok(updated)
    }

    /// Pause active timers blocking `resource` (all of them for `*`) for
    /// `duration_millis`. Returns how many were paused.
    pub fn pause_timers_for(
        &self,
        resource: &ResourceId,
        now_millis: i64,
        duration_millis: i64,
    ) -> StoreResult<usize> {
        let mut paused = 0;
        self.store.modify(&mut |s| {
            paused = pause_matching(
                &mut s.active_timers,
                resource,
                now_millis,
                now_millis + duration_millis,
            );
        })?;
        Ok(paused)
    }

    /// Remove all persisted state
    pub fn clear(&self) -> StoreResult<()> {
        self.store.clear()
    }

    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }
}

fn pause_matching(
    timers: &mut [ActiveTimer],
    resource: &ResourceId,
    now_millis: i64,
    until_millis: i64,
) -> usize {
    let mut paused = 0;
    for timer in timers.iter_mut() {
        let matches = resource.is_wildcard() || timer.blocks(resource.as_str());
        if matches && timer.is_active(now_millis) {
            *timer = timer.with_pause_until(until_millis);
            paused += 1;
        }
    }
    if paused > 0 {
        debug!(resource = %resource, paused, until = until_millis, "Paused timers for bypass");
    }
    paused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use focusguard_model::{OneTimeWindow, TimerMode};
    use focusguard_util::{BypassId, MINUTE_MILLIS, RuleId};

    const T: i64 = 1_700_000_000_000;

    fn repo() -> BlockRepository {
        BlockRepository::new(Arc::new(MemoryStore::new()))
    }

    fn timer(id: &str, minutes: i64, apps: &[&str]) -> ActiveTimer {
        ActiveTimer::new(
            TimerId::new(id),
            T,
            minutes,
            apps.iter().map(|a| ResourceId::from(*a)).collect(),
            TimerMode::Focus,
        )
        .unwrap()
    }

    fn bypass(id: &str, resource: &str, granted: i64) -> BypassRule {
        BypassRule::new(BypassId::new(id), ResourceId::new(resource), granted, 120_000).unwrap()
    }

    #[test]
    fn rules_and_bypasses_are_replaced_wholesale() {
        let repo = repo();
        let rule = BlockRule::new(
            RuleId::new("r1"),
            [ResourceId::new("app.a")],
            OneTimeWindow::new(0, 10).unwrap(),
            0,
        )
        .unwrap();
        repo.save_block_rules(vec![rule.clone()]).unwrap();
        repo.save_bypasses(vec![bypass("b1", "app.a", T)]).unwrap();

        assert_eq!(repo.block_rules().unwrap(), vec![rule]);
        assert_eq!(repo.bypasses().unwrap().len(), 1);

        repo.save_block_rules(Vec::new()).unwrap();
        assert!(repo.block_rules().unwrap().is_empty());
        assert_eq!(repo.bypasses().unwrap().len(), 1);
    }

    #[test]
    fn clears_expired_bypasses() {
        let repo = repo();
        repo.save_bypasses(vec![bypass("old", "app.a", T - 200_000), bypass("new", "app.b", T)])
            .unwrap();
        assert_eq!(repo.clear_expired_bypasses(T).unwrap(), 1);
        assert_eq!(repo.bypasses().unwrap()[0].id().as_str(), "new");
    }

    #[test]
    fn active_timers_prune_expired_and_hide_paused() {
        let repo = repo();
        assert!(repo.save_active_timer(timer("short", 1, &["app.a"]), T).unwrap());
        assert!(repo.save_active_timer(timer("long", 30, &["app.a"]), T).unwrap());
        repo.pause_timers_for(&ResourceId::new("app.a"), T, MINUTE_MILLIS / 2).unwrap();

        // Both paused for 30s
        assert!(repo.active_timers(T + 1_000).unwrap().is_empty());

        // Short timer has expired and is pruned; long one resumed
        let active = repo.active_timers(T + 2 * MINUTE_MILLIS).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id().as_str(), "long");
        assert_eq!(repo.snapshot().unwrap().active_timers.len(), 1);
    }

    #[test]
    fn duplicate_timer_id_is_refused() {
        let repo = repo();
        assert!(repo.save_active_timer(timer("t1", 5, &["app.a"]), T).unwrap());
        assert!(!repo.save_active_timer(timer("t1", 10, &["app.b"]), T).unwrap());
        assert!(repo.save_active_timer(timer("t2", 5, &["app.a"]), T).unwrap());
    }

    #[test]
    fn clear_and_update_timers() {
        let repo = repo();
        repo.save_active_timer(timer("t1", 5, &["app.a"]), T).unwrap();
        repo.save_active_timer(timer("t2", 5, &["app.b"]), T).unwrap();

        assert!(repo.clear_active_timer(&TimerId::new("t1")).unwrap());
        assert!(!repo.clear_active_timer(&TimerId::new("t1")).unwrap());

        let paused = timer("t2", 5, &["app.b"]).with_pause_until(T + 1_000);
        assert!(repo.update_active_timer(paused, T).unwrap());
        assert!(repo.active_timers(T + 500).unwrap().is_empty());
        assert!(!repo.update_active_timer(timer("missing", 5, &[]), T).unwrap());

        assert_eq!(repo.clear_expired_timers(T + 6 * MINUTE_MILLIS).unwrap(), 1);
        repo.save_active_timer(timer("t3", 5, &["app.c"]), T).unwrap();
        repo.clear_all_active_timers().unwrap();
        assert!(repo.snapshot().unwrap().active_timers.is_empty());
    }

    #[test]
    fn wildcard_pauses_everything() {
        let repo = repo();
        repo.save_active_timer(timer("t1", 5, &["app.a"]), T).unwrap();
        repo.save_active_timer(timer("t2", 5, &["app.b"]), T).unwrap();
        let paused = repo
            .pause_timers_for(&ResourceId::new(ResourceId::WILDCARD), T, 1_000)
            .unwrap();
        assert_eq!(paused, 2);
    }

    #[test]
    fn pause_keeps_end_time() {
        let repo = repo();
        repo.save_active_timer(timer("t1", 25, &["app.b"]), T).unwrap();
        repo.pause_timers_for(&ResourceId::new("app.b"), T + MINUTE_MILLIS, 120_000).unwrap();

        let stored = &repo.snapshot().unwrap().active_timers[0];
        assert!(!stored.is_active(T + 2 * MINUTE_MILLIS));
        assert!(stored.is_active(T + 3 * MINUTE_MILLIS));
        assert_eq!(stored.end_time_millis(), T + 25 * MINUTE_MILLIS);
    }

    #[test]
    fn grant_bypass_refuses_while_one_is_active() {
        let repo = repo();
        repo.save_active_timer(timer("t1", 25, &["app.a"]), T).unwrap();

        assert!(repo.grant_bypass(bypass("b1", "app.a", T), T).unwrap());
        assert!(!repo.grant_bypass(bypass("b2", "app.b", T + 1_000), T + 1_000).unwrap());
        assert!(repo.active_timers(T + 1_000).unwrap().is_empty());

        // Once the first bypass has expired a new one may be granted
        assert!(repo.grant_bypass(bypass("b3", "app.b", T + 130_000), T + 130_000).unwrap());
        let ids: Vec<String> = repo.bypasses().unwrap().iter().map(|b| b.id().to_string()).collect();
        assert_eq!(ids, vec!["b3".to_string()]);
    }

    fn one_time(id: &str, app: &str, start: i64, end: i64) -> BlockRule {
        BlockRule::new(
            RuleId::new(id),
            [ResourceId::new(app)],
            OneTimeWindow::new(start, end).unwrap(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn replacement_refused_while_rules_enforce() {
        let repo = repo();
        let window = one_time("window", "app.a", T, T + 60_000);
        repo.save_block_rules(vec![window.clone()]).unwrap();

        let next = vec![one_time("next", "app.b", 0, 10)];
        assert!(!repo.replace_block_rules_if_unlocked(next.clone(), T + 1).unwrap());
        assert_eq!(repo.block_rules().unwrap(), vec![window]);

        // A bypass keeps the lock even after the window closes
        repo.save_bypasses(vec![bypass("b1", "app.c", T + 60_000)]).unwrap();
        assert!(!repo.replace_block_rules_if_unlocked(next.clone(), T + 61_000).unwrap());

        assert!(repo.replace_block_rules_if_unlocked(next.clone(), T + 200_000).unwrap());
        assert_eq!(repo.block_rules().unwrap(), next);
    }

    #[test]
    fn replacement_allowed_with_no_stored_rules() {
        let repo = repo();
        repo.save_bypasses(vec![bypass("b1", "app.a", T)]).unwrap();
        let rules = vec![one_time("r1", "app.a", 0, 10), one_time("r1", "app.b", 0, 10)];
        assert!(repo.replace_block_rules_if_unlocked(rules, T).unwrap());

        let stored = repo.block_rules().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].targets("app.a"));
    }
}
