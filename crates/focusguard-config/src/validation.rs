//! Configuration validation

use crate::schema::RawConfig;
use focusguard_model::BypassRule;
use thiserror::Error;

/// Upper bound for any enforcement delay
pub const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

/// Upper bound for the housekeeping interval
pub const MAX_MONITOR_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("[{section}] {key}: {message}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        message: String,
    },

    #[error("[enforcement] {key}: resource id must not be blank")]
    BlankResource { key: &'static str },

    #[error("[service] store_file '{0}' must be a plain filename")]
    InvalidStoreFile(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(file) = &config.service.store_file
        && (file.trim().is_empty() || file.contains('/') || file.contains('\\'))
    {
        errors.push(ValidationError::InvalidStoreFile(file.clone()));
    }

    let enforcement = &config.enforcement;
    let delays = [
        ("cooldown_ms", enforcement.cooldown_ms),
        ("home_delay_ms", enforcement.home_delay_ms),
        ("overlay_timeout_ms", enforcement.overlay_timeout_ms),
        ("kill_delay_ms", enforcement.kill_delay_ms),
        ("min_kill_interval_ms", enforcement.min_kill_interval_ms),
    ];
    for (key, value) in delays {
        if let Some(ms) = value
            && ms > MAX_DELAY_MS
        {
            errors.push(ValidationError::InvalidValue {
                section: "enforcement",
                key,
                message: format!("{}ms exceeds maximum {}ms", ms, MAX_DELAY_MS),
            });
        }
    }

    if enforcement.overlay_timeout_ms == Some(0) {
        errors.push(ValidationError::InvalidValue {
            section: "enforcement",
            key: "overlay_timeout_ms",
            message: "must be positive".into(),
        });
    }

    for (key, value) in [
        ("home_resource", &enforcement.home_resource),
        ("self_resource", &enforcement.self_resource),
    ] {
        if value.as_ref().is_some_and(|id| id.trim().is_empty()) {
            errors.push(ValidationError::BlankResource { key });
        }
    }

    if let Some(ignored) = &enforcement.ignored_resources
        && ignored.iter().any(|id| id.trim().is_empty())
    {
        errors.push(ValidationError::BlankResource {
            key: "ignored_resources",
        });
    }

    for (key, value) in [
        ("block_message", &enforcement.block_message),
        ("pomodoro_message", &enforcement.pomodoro_message),
    ] {
        if value.as_ref().is_some_and(|m| m.trim().is_empty()) {
            errors.push(ValidationError::InvalidValue {
                section: "enforcement",
                key,
                message: "message must not be empty".into(),
            });
        }
    }

    if let Some(ms) = config.bypass.duration_ms {
        let max = BypassRule::MAX_DURATION_MILLIS as u64;
        if ms == 0 || ms > max {
            errors.push(ValidationError::InvalidValue {
                section: "bypass",
                key: "duration_ms",
                message: format!("must be in 1..={}, got {}", max, ms),
            });
        }
    }

    if let Some(secs) = config.monitor.interval_secs
        && (secs == 0 || secs > MAX_MONITOR_INTERVAL_SECS)
    {
        errors.push(ValidationError::InvalidValue {
            section: "monitor",
            key: "interval_secs",
            message: format!("must be in 1..={}, got {}", MAX_MONITOR_INTERVAL_SECS, secs),
        });
    }

    errors
}
