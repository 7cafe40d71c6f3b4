//! The persisted document

use focusguard_model::{ActiveTimer, BlockRule, BypassRule};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::StoreResult;

/// Everything the policy core persists, read and written as one JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Rule ids are unique; a document repeating one keeps the first
    #[serde(deserialize_with = "unique_rules")]
    pub block_rules: Vec<BlockRule>,
    pub bypasses: Vec<BypassRule>,
    /// Absent in documents written before timers existed
    #[serde(default)]
    pub active_timers: Vec<ActiveTimer>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.block_rules.is_empty() && self.bypasses.is_empty() && self.active_timers.is_empty()
    }
}

/// Drop every rule whose id already appeared earlier in `rules`
pub fn dedup_rules(rules: Vec<BlockRule>) -> Vec<BlockRule> {
    let mut seen = HashSet::new();
    rules
        .into_iter()
        .filter(|rule| {
            let first = seen.insert(rule.id().clone());
            if !first {
                warn!(rule_id = %rule.id(), "Dropping rule with duplicate id");
            }
            first
        })
        .collect()
}

fn unique_rules<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<BlockRule>, D::Error> {
    Ok(dedup_rules(Vec::deserialize(deserializer)?))
}
