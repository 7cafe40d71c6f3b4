//! Decision engine
//!
//! Pure functions over an explicit rule/bypass snapshot. Nothing here touches
//! storage or the clock, so verdicts can be computed from any thread.

use focusguard_model::{BlockRule, BypassRule, DecisionResult};
use tracing::debug;

/// Which rules a next-evaluation computation looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope<'a> {
    /// Only rules targeting this resource
    Resource(&'a str),
    /// Every rule: "when does any rule's state next change"
    Any,
}

impl ResourceScope<'_> {
    fn includes(&self, rule: &BlockRule) -> bool {
        match self {
            ResourceScope::Resource(resource) => rule.targets(resource),
            ResourceScope::Any => true,
        }
    }
}

/// The block/allow decision engine
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    /// Verdict for `resource` at `now_millis`.
    ///
    /// An active bypass always allows; it reports the rule it overrides, if
    /// any. Without a bypass, any active rule targeting the resource blocks.
    pub fn evaluate(
        resource: &str,
        now_millis: i64,
        rules: &[BlockRule],
        bypasses: &[BypassRule],
    ) -> DecisionResult {
        let sorted = Self::sorted(rules);

        let bypass = bypasses
            .iter()
            .find(|b| b.covers(resource) && b.is_active(now_millis));
        let blocking = sorted
            .iter()
            .find(|r| r.is_blocked(resource, now_millis))
            .copied();

        let result = match (bypass, blocking) {
            (Some(bypass), blocking) => DecisionResult::allow_bypass(
                bypass.id().clone(),
                blocking.map(|r| r.id().clone()),
                Some(bypass.expires_at_millis()),
            ),
            (None, Some(rule)) => {
                let next = Self::calculate_next_evaluation_time(
                    ResourceScope::Resource(resource),
                    now_millis,
                    rules,
                );
                // An active window always closes again, so a blocking rule
                // contributes at least its own boundary.
                let next = next.unwrap_or_else(|| {
                    panic!("active rule {} has no next boundary", rule.id())
                });
                DecisionResult::block(rule.id().clone(), next)
            }
            (None, None) => DecisionResult::allow(None),
        };

        debug!(
            resource,
            decision = ?result.decision(),
            next_eval = ?result.next_evaluation_time(),
            "Evaluated resource"
        );
        result
    }

    /// Earliest boundary strictly after `now_millis` among the rules in
    /// `scope`, or `None` when no rule will change state again.
    pub fn calculate_next_evaluation_time(
        scope: ResourceScope<'_>,
        now_millis: i64,
        rules: &[BlockRule],
    ) -> Option<i64> {
        rules
            .iter()
            .filter(|r| scope.includes(r))
            .filter_map(|r| r.window().next_transition(now_millis))
            .min()
    }

    /// When the snapshot as a whole next needs a look: the earliest rule
    /// boundary, bypass start or bypass expiry after `now_millis`.
    pub fn next_wake_time(
        now_millis: i64,
        rules: &[BlockRule],
        bypasses: &[BypassRule],
    ) -> Option<i64> {
        let rule_next = Self::calculate_next_evaluation_time(ResourceScope::Any, now_millis, rules);
        let bypass_next = bypasses
            .iter()
            .filter_map(|b| {
                if b.granted_at_millis() > now_millis {
                    Some(b.granted_at_millis())
                } else if b.is_active(now_millis) {
                    Some(b.expires_at_millis())
                } else {
                    None
                }
            })
            .min();

        match (rule_next, bypass_next) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn sorted(rules: &[BlockRule]) -> Vec<&BlockRule> {
        let mut sorted: Vec<&BlockRule> = rules.iter().collect();
        sorted.sort_by(|a, b| BlockRule::precedence(a, b));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusguard_model::{
        DailyWindow, Decision, OneTimeWindow, Reason, WeekdayMask, WeekdayWindow,
    };
    use focusguard_util::{BypassId, DAY_MILLIS, HOUR_MILLIS, MINUTE_MILLIS, ResourceId, RuleId};
    use proptest::prelude::*;

    // 2024-01-01 00:00 UTC, a Monday
    const MONDAY: i64 = 1_704_067_200_000;

    fn daily_rule(id: &str, target: &str, start: i64, end: i64, priority: u32) -> BlockRule {
        BlockRule::new(
            RuleId::new(id),
            [ResourceId::new(target)],
            DailyWindow::new(start, 0, end, 0, 0).unwrap(),
            priority,
        )
        .unwrap()
    }

    fn bypass(id: &str, target: &str, granted_at: i64) -> BypassRule {
        BypassRule::new(
            BypassId::new(id),
            ResourceId::new(target),
            granted_at,
            BypassRule::DEFAULT_DURATION_MILLIS,
        )
        .unwrap()
    }

    #[test]
    fn test_block_inside_daily_window() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let now = MONDAY + 10 * HOUR_MILLIS;

        let result = DecisionEngine::evaluate("app.a", now, &[rule.clone()], &[]);
        assert_eq!(result.decision(), Decision::Block);
        assert_eq!(
            result.reason(),
            &Reason::Block {
                rule_id: rule.id().clone()
            }
        );
        assert_eq!(result.next_evaluation_time(), Some(MONDAY + 17 * HOUR_MILLIS));
    }

    #[test]
    fn test_allow_outside_daily_window() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let now = MONDAY + 18 * HOUR_MILLIS;

        let result = DecisionEngine::evaluate("app.a", now, &[rule], &[]);
        assert_eq!(result.decision(), Decision::Allow);
        assert_eq!(result.reason(), &Reason::None);
        assert_eq!(result.next_evaluation_time(), None);
    }

    #[test]
    fn test_bypass_overrides_active_rule() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let granted = MONDAY + 10 * HOUR_MILLIS;
        let b = bypass("b1", "app.a", granted);

        let result = DecisionEngine::evaluate("app.a", granted + 1_000, &[rule], &[b]);
        assert_eq!(result.decision(), Decision::Allow);
        assert_eq!(
            result.reason(),
            &Reason::Bypass {
                bypass_id: BypassId::new("b1"),
                blocked_by_rule_id: Some(RuleId::new("r1")),
            }
        );
        assert_eq!(result.next_evaluation_time(), Some(granted + 120_000));
    }

    #[test]
    fn test_bypass_without_rule() {
        let b = bypass("b1", "app.a", MONDAY);

        let result = DecisionEngine::evaluate("app.a", MONDAY + 5, &[], &[b]);
        assert_eq!(result.decision(), Decision::Allow);
        assert_eq!(
            result.reason(),
            &Reason::Bypass {
                bypass_id: BypassId::new("b1"),
                blocked_by_rule_id: None,
            }
        );
        assert_eq!(result.next_evaluation_time(), Some(MONDAY + 120_000));
    }

    #[test]
    fn test_expired_bypass_ignored() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let b = bypass("b1", "app.a", MONDAY + 10 * HOUR_MILLIS);
        let now = MONDAY + 11 * HOUR_MILLIS;

        let result = DecisionEngine::evaluate("app.a", now, &[rule], &[b]);
        assert!(result.is_block());
    }

    #[test]
    fn test_bypass_for_other_resource_ignored() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let now = MONDAY + 10 * HOUR_MILLIS;
        let b = bypass("b1", "app.b", now);

        let result = DecisionEngine::evaluate("app.a", now + 1, &[rule], &[b]);
        assert!(result.is_block());
    }

    #[test]
    fn test_untargeted_resource_allowed() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let result = DecisionEngine::evaluate("app.b", MONDAY + 10 * HOUR_MILLIS, &[rule], &[]);
        assert_eq!(result.decision(), Decision::Allow);
        assert_eq!(result.next_evaluation_time(), None);
    }

    #[test]
    fn test_highest_priority_rule_reported() {
        let low = daily_rule("low", "app.a", 8, 18, 1);
        let high = daily_rule("high", "app.a", 9, 17, 5);
        let now = MONDAY + 10 * HOUR_MILLIS;

        let result = DecisionEngine::evaluate("app.a", now, &[low, high], &[]);
        assert_eq!(result.blocking_rule(), Some(&RuleId::new("high")));
        // The low rule still contributes nothing earlier than 17:00
        assert_eq!(result.next_evaluation_time(), Some(MONDAY + 17 * HOUR_MILLIS));
    }

    #[test]
    fn test_equal_priority_ties_break_on_id() {
        let b = daily_rule("b", "app.a", 9, 17, 2);
        let a = daily_rule("a", "app.a", 9, 17, 2);
        let now = MONDAY + 10 * HOUR_MILLIS;

        let result = DecisionEngine::evaluate("app.a", now, &[b, a], &[]);
        assert_eq!(result.blocking_rule(), Some(&RuleId::new("a")));
    }

    #[test]
    fn test_block_next_eval_uses_earliest_rule() {
        let long = daily_rule("long", "app.a", 9, 17, 0);
        let soon = BlockRule::new(
            RuleId::new("soon"),
            [ResourceId::new("app.a")],
            OneTimeWindow::new(MONDAY + 11 * HOUR_MILLIS, MONDAY + 12 * HOUR_MILLIS).unwrap(),
            0,
        )
        .unwrap();
        let now = MONDAY + 10 * HOUR_MILLIS;

        let result = DecisionEngine::evaluate("app.a", now, &[long, soon], &[]);
        assert!(result.is_block());
        assert_eq!(result.next_evaluation_time(), Some(MONDAY + 11 * HOUR_MILLIS));
    }

    #[test]
    fn test_next_evaluation_for_one_time() {
        let rule = BlockRule::new(
            RuleId::new("once"),
            [ResourceId::new("app.a")],
            OneTimeWindow::new(1_000, 2_000).unwrap(),
            0,
        )
        .unwrap();
        let rules = [rule];
        let scope = ResourceScope::Resource("app.a");

        assert_eq!(DecisionEngine::calculate_next_evaluation_time(scope, 0, &rules), Some(1_000));
        assert_eq!(DecisionEngine::calculate_next_evaluation_time(scope, 1_500, &rules), Some(2_000));
        assert_eq!(DecisionEngine::calculate_next_evaluation_time(scope, 2_000, &rules), None);
    }

    #[test]
    fn test_next_evaluation_scoped_to_resource() {
        let a = daily_rule("a", "app.a", 9, 17, 0);
        let b = daily_rule("b", "app.b", 12, 13, 0);
        let rules = [a, b];
        let now = MONDAY + 10 * HOUR_MILLIS;

        assert_eq!(
            DecisionEngine::calculate_next_evaluation_time(ResourceScope::Resource("app.a"), now, &rules),
            Some(MONDAY + 17 * HOUR_MILLIS)
        );
        assert_eq!(
            DecisionEngine::calculate_next_evaluation_time(ResourceScope::Any, now, &rules),
            Some(MONDAY + 12 * HOUR_MILLIS)
        );
        assert_eq!(
            DecisionEngine::calculate_next_evaluation_time(ResourceScope::Resource("app.c"), now, &rules),
            None
        );
    }

    #[test]
    fn test_weekday_window_skips_to_next_enabled_day() {
        // Weekends only, 10:00-12:00 UTC. Monday noon: next opens Saturday 10:00.
        let rule = BlockRule::new(
            RuleId::new("weekend"),
            [ResourceId::new("app.a")],
            WeekdayWindow::from_parts(
                WeekdayMask::WEEKENDS,
                DailyWindow::new(10, 0, 12, 0, 0).unwrap(),
            ),
            0,
        )
        .unwrap();
        let now = MONDAY + 12 * HOUR_MILLIS;

        assert_eq!(
            DecisionEngine::calculate_next_evaluation_time(ResourceScope::Any, now, &[rule]),
            Some(MONDAY + 5 * DAY_MILLIS + 10 * HOUR_MILLIS)
        );
    }

    #[test]
    fn test_next_wake_includes_bypass_boundaries() {
        let rule = daily_rule("r1", "app.a", 9, 17, 0);
        let now = MONDAY + 10 * HOUR_MILLIS;
        let active = bypass("active", "app.a", now - MINUTE_MILLIS);
        let pending = bypass("pending", "app.b", now + 30 * MINUTE_MILLIS);

        assert_eq!(
            DecisionEngine::next_wake_time(now, &[rule.clone()], &[active.clone(), pending.clone()]),
            Some(active.expires_at_millis())
        );
        assert_eq!(
            DecisionEngine::next_wake_time(now, &[rule], &[pending.clone()]),
            Some(pending.granted_at_millis())
        );
        assert_eq!(DecisionEngine::next_wake_time(now, &[], &[]), None);
    }

    fn arb_daily_rule() -> impl Strategy<Value = BlockRule> {
        (0i64..24, 0i64..60, 0i64..24, 0i64..60, -12i64..=12, 0u32..4, "[a-z]{1,4}").prop_map(
            |(sh, sm, eh, em, tz, priority, id)| {
                BlockRule::new(
                    RuleId::new(id),
                    [ResourceId::new("app.a")],
                    DailyWindow::new(sh, sm, eh, em, tz * HOUR_MILLIS).unwrap(),
                    priority,
                )
                .unwrap()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_next_evaluation_is_minimal(
            rules in prop::collection::vec(arb_daily_rule(), 1..4),
            offset in 0i64..(7 * DAY_MILLIS),
        ) {
            let now = MONDAY + offset;
            let next = DecisionEngine::calculate_next_evaluation_time(ResourceScope::Any, now, &rules);
            if let Some(next) = next {
                prop_assert!(next > now);
                // Nothing changes strictly between now and next, checked per minute
                let states: Vec<bool> = rules.iter().map(|r| r.is_active(now)).collect();
                let mut t = now + 1;
                while t < next {
                    let current: Vec<bool> = rules.iter().map(|r| r.is_active(t)).collect();
                    prop_assert_eq!(&current, &states);
                    t += MINUTE_MILLIS;
                }
                let after: Vec<bool> = rules.iter().map(|r| r.is_active(next)).collect();
                prop_assert_ne!(after, states);
            }
        }

        #[test]
        fn prop_block_always_has_next_evaluation(
            rules in prop::collection::vec(arb_daily_rule(), 1..4),
            offset in 0i64..DAY_MILLIS,
        ) {
            let result = DecisionEngine::evaluate("app.a", MONDAY + offset, &rules, &[]);
            if result.is_block() {
                prop_assert!(result.next_evaluation_time().is_some());
            }
        }
    }
}
