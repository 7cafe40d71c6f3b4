//! Parsing of externally submitted rule batches
//!
//! A batch is a JSON array of rule objects in the snapshot format. Parsing is
//! lenient per entry: an entry that fails validation is dropped and logged,
//! the rest of the batch survives. A missing `id` gets a fresh UUID and a
//! missing `priority` defaults to 0. Only a document that is not a JSON array
//! fails the whole batch.

use crate::{ConfigError, ConfigResult};
use focusguard_model::BlockRule;
use focusguard_util::RuleId;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Parse a rule batch, dropping invalid entries. When ids repeat, the first
/// entry wins.
pub fn parse_rule_batch(json: &str) -> ConfigResult<Vec<BlockRule>> {
    let document: Value = serde_json::from_str(json)?;
    let Value::Array(entries) = document else {
        return Err(ConfigError::InvalidRuleBatch("expected a JSON array".into()));
    };

    let submitted = entries.len();
    let mut rules = Vec::with_capacity(submitted);
    let mut seen = HashSet::new();

    for (index, mut entry) in entries.into_iter().enumerate() {
        if let Some(obj) = entry.as_object_mut() {
            let has_id = obj.get("id").is_some_and(Value::is_string);
            if !has_id {
                obj.insert("id".into(), Value::String(RuleId::generate().to_string()));
            }
            obj.entry("priority").or_insert(Value::from(0));
        }

        match serde_json::from_value::<BlockRule>(entry) {
            Ok(rule) if !seen.insert(rule.id().clone()) => {
                warn!(index, rule_id = %rule.id(), "Dropping rule with duplicate id from batch");
            }
            Ok(rule) => rules.push(rule),
            Err(e) => warn!(index, error = %e, "Dropping invalid rule from batch"),
        }
    }

    debug!(submitted, accepted = rules.len(), "Parsed rule batch");
    Ok(rules)
}
