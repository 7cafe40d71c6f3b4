//! Emergency bypass grants

use focusguard_util::{BypassId, HOUR_MILLIS, MAX_TIMESTAMP_MILLIS, MINUTE_MILLIS, ResourceId};
use serde::{Deserialize, Serialize};

use crate::{ValidationError, ValidationResult};

/// Temporary unconditional allow for one resource.
///
/// A bypass for [`ResourceId::WILDCARD`] is stored like any other; only the
/// timer pause on grant treats it specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BypassRecord", into = "BypassRecord")]
pub struct BypassRule {
    id: BypassId,
    resource_id: ResourceId,
    granted_at_millis: i64,
    duration_millis: i64,
}

impl BypassRule {
    pub const DEFAULT_DURATION_MILLIS: i64 = 2 * MINUTE_MILLIS;
    pub const MAX_DURATION_MILLIS: i64 = 24 * HOUR_MILLIS;

    pub fn new(
        id: BypassId,
        resource_id: ResourceId,
        granted_at_millis: i64,
        duration_millis: i64,
    ) -> ValidationResult<Self> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::BlankId { kind: "Bypass" });
        }
        if resource_id.is_blank() {
            return Err(ValidationError::BlankResource);
        }
        if granted_at_millis < 0 {
            return Err(ValidationError::NegativeTimestamp {
                field: "Granted time",
                value: granted_at_millis,
            });
        }
        if granted_at_millis > MAX_TIMESTAMP_MILLIS {
            return Err(ValidationError::TimestampTooLate {
                field: "Granted time",
                value: granted_at_millis,
                max: MAX_TIMESTAMP_MILLIS,
            });
        }
        if duration_millis <= 0 {
            return Err(ValidationError::NonPositiveDuration(duration_millis));
        }
        if duration_millis > Self::MAX_DURATION_MILLIS {
            return Err(ValidationError::DurationTooLong {
                value: duration_millis,
                max: Self::MAX_DURATION_MILLIS,
            });
        }
        Ok(Self {
            id,
            resource_id,
            granted_at_millis,
            duration_millis,
        })
    }

    pub fn id(&self) -> &BypassId {
        &self.id
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn granted_at_millis(&self) -> i64 {
        self.granted_at_millis
    }

    pub fn duration_millis(&self) -> i64 {
        self.duration_millis
    }

    pub fn expires_at_millis(&self) -> i64 {
        self.granted_at_millis + self.duration_millis
    }

    pub fn is_active(&self, now_millis: i64) -> bool {
        (self.granted_at_millis..self.expires_at_millis()).contains(&now_millis)
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at_millis()
    }

    pub fn covers(&self, resource: &str) -> bool {
        self.resource_id.as_str() == resource
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BypassRecord {
    id: String,
    resource_id: String,
    granted_at_millis: i64,
    duration_millis: i64,
}

impl TryFrom<BypassRecord> for BypassRule {
    type Error = ValidationError;

    fn try_from(r: BypassRecord) -> Result<Self, Self::Error> {
        BypassRule::new(
            BypassId::new(r.id),
            ResourceId::new(r.resource_id),
            r.granted_at_millis,
            r.duration_millis,
        )
    }
}

impl From<BypassRule> for BypassRecord {
    fn from(b: BypassRule) -> Self {
        Self {
            id: b.id.to_string(),
            resource_id: b.resource_id.to_string(),
            granted_at_millis: b.granted_at_millis,
            duration_millis: b.duration_millis,
        }
    }
}
