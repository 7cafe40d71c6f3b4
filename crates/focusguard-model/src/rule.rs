//! Block rules

use focusguard_util::{ResourceId, RuleId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::{
    DAILY_TAG, DailyWindow, ONE_TIME_TAG, OneTimeWindow, RuleWindow, ValidationError,
    ValidationResult, WEEKDAY_TAG, WeekdayMask, WeekdayWindow,
};

/// A rule blocking a set of resources while its window is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BlockRuleRecord", into = "BlockRuleRecord")]
pub struct BlockRule {
    id: RuleId,
    target_apps: BTreeSet<ResourceId>,
    window: RuleWindow,
    priority: u32,
}

impl BlockRule {
    pub fn new(
        id: RuleId,
        target_apps: impl IntoIterator<Item = ResourceId>,
        window: impl Into<RuleWindow>,
        priority: u32,
    ) -> ValidationResult<Self> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::BlankId { kind: "Rule" });
        }
        let target_apps: BTreeSet<ResourceId> = target_apps.into_iter().collect();
        if target_apps.is_empty() {
            return Err(ValidationError::EmptyTargets {
                rule_id: id.to_string(),
            });
        }
        Ok(Self {
            id,
            target_apps,
            window: window.into(),
            priority,
        })
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn target_apps(&self) -> &BTreeSet<ResourceId> {
        &self.target_apps
    }

    pub fn window(&self) -> &RuleWindow {
        &self.window
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn targets(&self, resource: &str) -> bool {
        self.target_apps.contains(resource)
    }

    pub fn is_active(&self, now_millis: i64) -> bool {
        self.window.evaluate(now_millis)
    }

    /// Whether this rule blocks `resource` at `now_millis`
    pub fn is_blocked(&self, resource: &str, now_millis: i64) -> bool {
        self.targets(resource) && self.is_active(now_millis)
    }

    /// Evaluation order: higher priority first, then ascending id
    pub fn precedence(a: &BlockRule, b: &BlockRule) -> Ordering {
        b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id))
    }
}

/// On-disk shape of a rule. Field presence depends on `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockRuleRecord {
    id: String,
    target_apps: Vec<String>,
    #[serde(default)]
    priority: i64,
    #[serde(rename = "type")]
    rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weekday_mask: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_hour: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_minute: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_hour: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_minute: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone_offset_millis: Option<i64>,
}

impl BlockRuleRecord {
    fn field(&self, value: Option<i64>, rule_type: &'static str, field: &'static str) -> ValidationResult<i64> {
        value.ok_or(ValidationError::MissingField { rule_type, field })
    }

    fn daily(&self, rule_type: &'static str) -> ValidationResult<DailyWindow> {
        DailyWindow::new(
            self.field(self.start_hour, rule_type, "startHour")?,
            self.field(self.start_minute, rule_type, "startMinute")?,
            self.field(self.end_hour, rule_type, "endHour")?,
            self.field(self.end_minute, rule_type, "endMinute")?,
            self.timezone_offset_millis.unwrap_or(0),
        )
    }

    fn window(&self) -> ValidationResult<RuleWindow> {
        match self.rule_type.as_str() {
            ONE_TIME_TAG => Ok(OneTimeWindow::new(
                self.field(self.start_time_millis, ONE_TIME_TAG, "startTimeMillis")?,
                self.field(self.end_time_millis, ONE_TIME_TAG, "endTimeMillis")?,
            )?
            .into()),
            DAILY_TAG => Ok(self.daily(DAILY_TAG)?.into()),
            WEEKDAY_TAG => {
                let days = WeekdayMask::from_raw(self.field(self.weekday_mask, WEEKDAY_TAG, "weekdayMask")?)?;
                Ok(WeekdayWindow::from_parts(days, self.daily(WEEKDAY_TAG)?).into())
            }
            other => Err(ValidationError::UnknownRuleType(other.to_string())),
        }
    }
}

impl TryFrom<BlockRuleRecord> for BlockRule {
    type Error = ValidationError;

    fn try_from(record: BlockRuleRecord) -> Result<Self, Self::Error> {
        if record.priority < 0 {
            return Err(ValidationError::NegativePriority(record.priority));
        }
        let priority = u32::try_from(record.priority).unwrap_or(u32::MAX);
        let window = record.window()?;
        BlockRule::new(
            RuleId::new(record.id),
            record.target_apps.into_iter().map(ResourceId::from),
            window,
            priority,
        )
    }
}

impl From<BlockRule> for BlockRuleRecord {
    fn from(rule: BlockRule) -> Self {
        let mut record = BlockRuleRecord {
            id: rule.id.to_string(),
            target_apps: rule.target_apps.iter().map(|r| r.to_string()).collect(),
            priority: rule.priority as i64,
            rule_type: rule.window.type_tag().to_string(),
            start_time_millis: None,
            end_time_millis: None,
            weekday_mask: None,
            start_hour: None,
            start_minute: None,
            end_hour: None,
            end_minute: None,
            timezone_offset_millis: None,
        };

        let span = match rule.window {
            RuleWindow::OneTime(w) => {
                record.start_time_millis = Some(w.start_millis());
                record.end_time_millis = Some(w.end_millis());
                None
            }
            RuleWindow::Daily(w) => Some(w),
            RuleWindow::Weekday(w) => {
                record.weekday_mask = Some(w.days().bits() as i64);
                Some(*w.span())
            }
        };

        if let Some(span) = span {
            record.start_hour = Some(span.start().hour as i64);
            record.start_minute = Some(span.start().minute as i64);
            record.end_hour = Some(span.end().hour as i64);
            record.end_minute = Some(span.end().minute as i64);
            record.timezone_offset_millis = Some(span.tz_offset_millis());
        }

        record
    }
}
