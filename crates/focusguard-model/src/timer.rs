//! Countdown timers

use focusguard_util::{MAX_TIMESTAMP_MILLIS, MINUTE_MILLIS, ResourceId, SECOND_MILLIS, TimerId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ValidationError, ValidationResult};

/// Kind of countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    #[default]
    Focus,
    PomodoroFocus,
    PomodoroBreak,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "FOCUS",
            TimerMode::PomodoroFocus => "POMODORO_FOCUS",
            TimerMode::PomodoroBreak => "POMODORO_BREAK",
        }
    }

    /// Parse a persisted mode name; unknown names fall back to [`TimerMode::Focus`]
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "POMODORO_FOCUS" => TimerMode::PomodoroFocus,
            "POMODORO_BREAK" => TimerMode::PomodoroBreak,
            _ => TimerMode::Focus,
        }
    }

    pub fn is_pomodoro(&self) -> bool {
        matches!(self, TimerMode::PomodoroFocus | TimerMode::PomodoroBreak)
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-bounded hard block over a set of resources.
///
/// Pausing hides the timer until `paused_until_millis` without moving its end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ActiveTimerRecord", into = "ActiveTimerRecord")]
pub struct ActiveTimer {
    id: TimerId,
    start_time_millis: i64,
    duration_minutes: u32,
    blocked_packages: Vec<ResourceId>,
    mode: TimerMode,
    paused_until_millis: Option<i64>,
}

impl ActiveTimer {
    pub fn new(
        id: TimerId,
        start_time_millis: i64,
        duration_minutes: i64,
        blocked_packages: Vec<ResourceId>,
        mode: TimerMode,
    ) -> ValidationResult<Self> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::BlankId { kind: "Timer" });
        }
        if start_time_millis < 0 {
            return Err(ValidationError::NegativeTimestamp {
                field: "Start time",
                value: start_time_millis,
            });
        }
        if start_time_millis > MAX_TIMESTAMP_MILLIS {
            return Err(ValidationError::TimestampTooLate {
                field: "Start time",
                value: start_time_millis,
                max: MAX_TIMESTAMP_MILLIS,
            });
        }
        if duration_minutes <= 0 {
            return Err(ValidationError::NonPositiveDuration(duration_minutes));
        }
        let duration_minutes =
            u32::try_from(duration_minutes).map_err(|_| ValidationError::DurationTooLong {
                value: duration_minutes,
                max: u32::MAX as i64,
            })?;
        Ok(Self {
            id,
            start_time_millis,
            duration_minutes,
            blocked_packages,
            mode,
            paused_until_millis: None,
        })
    }

    /// Copy of this timer hidden until `until_millis`
    pub fn with_pause_until(&self, until_millis: i64) -> Self {
        Self {
            paused_until_millis: Some(until_millis),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &TimerId {
        &self.id
    }

    pub fn start_time_millis(&self) -> i64 {
        self.start_time_millis
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn duration_millis(&self) -> i64 {
        self.duration_minutes as i64 * MINUTE_MILLIS
    }

    pub fn end_time_millis(&self) -> i64 {
        self.start_time_millis + self.duration_millis()
    }

    pub fn blocked_packages(&self) -> &[ResourceId] {
        &self.blocked_packages
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn paused_until_millis(&self) -> Option<i64> {
        self.paused_until_millis
    }

    pub fn is_pomodoro(&self) -> bool {
        self.mode.is_pomodoro()
    }

    pub fn blocks(&self, resource: &str) -> bool {
        self.blocked_packages.iter().any(|r| r.as_str() == resource)
    }

    /// Whole seconds until the end, never negative
    pub fn remaining_seconds(&self, now_millis: i64) -> i64 {
        ((self.end_time_millis() - now_millis) / SECOND_MILLIS).max(0)
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis >= self.end_time_millis()
    }

    pub fn is_paused(&self, now_millis: i64) -> bool {
        self.paused_until_millis.is_some_and(|until| now_millis < until)
    }

    pub fn is_active(&self, now_millis: i64) -> bool {
        now_millis >= self.start_time_millis && !self.is_expired(now_millis) && !self.is_paused(now_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveTimerRecord {
    id: String,
    start_time_millis: i64,
    duration_minutes: i64,
    #[serde(default)]
    blocked_packages: Vec<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paused_until_millis: Option<i64>,
}

impl TryFrom<ActiveTimerRecord> for ActiveTimer {
    type Error = ValidationError;

    fn try_from(r: ActiveTimerRecord) -> Result<Self, Self::Error> {
        let mode = r
            .mode
            .as_deref()
            .map(TimerMode::parse_lenient)
            .unwrap_or_default();
        let timer = ActiveTimer::new(
            TimerId::new(r.id),
            r.start_time_millis,
            r.duration_minutes,
            r.blocked_packages.into_iter().map(ResourceId::from).collect(),
            mode,
        )?;
        Ok(match r.paused_until_millis {
            Some(until) => timer.with_pause_until(until),
            None => timer,
        })
    }
}

impl From<ActiveTimer> for ActiveTimerRecord {
    fn from(t: ActiveTimer) -> Self {
        Self {
            id: t.id.to_string(),
            start_time_millis: t.start_time_millis,
            duration_minutes: t.duration_minutes as i64,
            blocked_packages: t.blocked_packages.iter().map(|r| r.to_string()).collect(),
            mode: Some(t.mode.as_str().to_string()),
            paused_until_millis: t.paused_until_millis,
        }
    }
}
