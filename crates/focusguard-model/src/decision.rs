//! Verdicts produced by the decision engine

use focusguard_util::{BypassId, RuleId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Block,
    Allow,
}

/// Why a verdict was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// An active rule blocks the resource
    Block { rule_id: RuleId },
    /// A bypass is active; `blocked_by_rule_id` names the rule it overrides, if any
    Bypass {
        bypass_id: BypassId,
        blocked_by_rule_id: Option<RuleId>,
    },
    None,
}

/// A verdict for one resource at one instant.
///
/// Only constructible through [`DecisionResult::block`],
/// [`DecisionResult::allow_bypass`] and [`DecisionResult::allow`], so a BLOCK
/// always carries a rule and a re-evaluation time, and an ALLOW never names a
/// blocking rule as its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    decision: Decision,
    reason: Reason,
    next_evaluation_time: Option<i64>,
}

impl DecisionResult {
    pub fn block(rule_id: RuleId, next_evaluation_time: i64) -> Self {
        Self {
            decision: Decision::Block,
            reason: Reason::Block { rule_id },
            next_evaluation_time: Some(next_evaluation_time),
        }
    }

    pub fn allow_bypass(
        bypass_id: BypassId,
        blocked_by_rule_id: Option<RuleId>,
        next_evaluation_time: Option<i64>,
    ) -> Self {
        Self {
            decision: Decision::Allow,
            reason: Reason::Bypass {
                bypass_id,
                blocked_by_rule_id,
            },
            next_evaluation_time,
        }
    }

    pub fn allow(next_evaluation_time: Option<i64>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: Reason::None,
            next_evaluation_time,
        }
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    pub fn next_evaluation_time(&self) -> Option<i64> {
        self.next_evaluation_time
    }

    pub fn is_block(&self) -> bool {
        self.decision == Decision::Block
    }

    /// The blocking rule, for BLOCK verdicts
    pub fn blocking_rule(&self) -> Option<&RuleId> {
        match &self.reason {
            Reason::Block { rule_id } => Some(rule_id),
            _ => None,
        }
    }
}
