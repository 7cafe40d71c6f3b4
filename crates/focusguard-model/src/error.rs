//! Validation errors for model construction

use focusguard_util::FocusError;
use thiserror::Error;

/// Rejection of a malformed rule, bypass or timer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} ID must not be blank")]
    BlankId { kind: &'static str },

    #[error("Resource ID must not be blank")]
    BlankResource,

    #[error("Rule '{rule_id}': target apps set must not be empty")]
    EmptyTargets { rule_id: String },

    #[error("Priority must be non-negative, got {0}")]
    NegativePriority(i64),

    #[error("{field} must be 0-23, got {value}")]
    InvalidHour { field: &'static str, value: i64 },

    #[error("{field} must be 0-59, got {value}")]
    InvalidMinute { field: &'static str, value: i64 },

    #[error("Weekday mask must be 1-127, got {0}")]
    InvalidWeekdayMask(i64),

    #[error("Start time {start} must be before end time {end}")]
    InvertedWindow { start: i64, end: i64 },

    #[error("{field} must be non-negative, got {value}")]
    NegativeTimestamp { field: &'static str, value: i64 },

    #[error("{field} {value} is past the latest supported instant {max}")]
    TimestampTooLate {
        field: &'static str,
        value: i64,
        max: i64,
    },

    #[error("Timezone offset must be within one day, got {0}ms")]
    InvalidTimezoneOffset(i64),

    #[error("Duration must be positive, got {0}")]
    NonPositiveDuration(i64),

    #[error("Duration {value}ms exceeds maximum {max}ms")]
    DurationTooLong { value: i64, max: i64 },

    #[error("Missing field '{field}' for {rule_type} rule")]
    MissingField {
        rule_type: &'static str,
        field: &'static str,
    },

    #[error("Unknown rule type: {0}")]
    UnknownRuleType(String),
}

impl From<ValidationError> for FocusError {
    fn from(e: ValidationError) -> Self {
        FocusError::validation(e.to_string())
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
