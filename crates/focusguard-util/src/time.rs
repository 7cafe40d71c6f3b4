//! Time utilities for focusguard
//!
//! All policy math is done on signed epoch milliseconds (`i64`), the unit the
//! persisted snapshot uses. Wall-clock windows are expressed as a time of day
//! plus a fixed timezone offset, so no timezone database is consulted.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `FOCUSGUARD_MOCK_TIME` environment variable can be set
//! to override the system time seen by [`SystemClock`]. The mock time advances
//! at the real rate from the moment the process started.
//!
//! Format: `YYYY-MM-DD HH:MM:SS`, interpreted as UTC (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicI64, Ordering};

pub const SECOND_MILLIS: i64 = 1_000;
pub const MINUTE_MILLIS: i64 = 60 * SECOND_MILLIS;
pub const HOUR_MILLIS: i64 = 60 * MINUTE_MILLIS;
pub const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;

/// Latest accepted start instant for timers and bypasses (9999-12-31 23:59:59.999 UTC).
/// Anything later leaves no room to add a duration without overflow.
pub const MAX_TIMESTAMP_MILLIS: i64 = 253_402_300_799_999;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "FOCUSGUARD_MOCK_TIME";

/// Format accepted in [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset between mock time and real time, captured once at first use.
static MOCK_TIME_OFFSET: OnceLock<Option<i64>> = OnceLock::new();

fn real_now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn get_mock_time_offset() -> Option<i64> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_mock_time(&mock_time_str) {
                    Some(mock_millis) => {
                        let offset = mock_millis - real_now_millis();
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset / SECOND_MILLIS,
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string into epoch milliseconds (UTC)
pub fn parse_mock_time(s: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(s, MOCK_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Source of the current instant in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// The system wall clock, respecting mock time in debug builds
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let real = real_now_millis();
        match get_mock_time_offset() {
            Some(offset) => real + offset,
            None => real,
        }
    }
}

/// A clock that only moves when told to. Used to drive the state machines
/// through synthetic timelines.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self(AtomicI64::new(start_millis))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) -> i64 {
        self.0.fetch_add(millis, Ordering::SeqCst) + millis
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Convenience wrapper around [`SystemClock`]
pub fn now_millis() -> i64 {
    SystemClock.now_millis()
}

/// Milliseconds since local midnight for the given instant and offset.
///
/// Always in `[0, DAY_MILLIS)` whatever the sign of either argument.
pub fn local_time_of_day(now_millis: i64, tz_offset_millis: i64) -> i64 {
    (now_millis.rem_euclid(DAY_MILLIS) - tz_offset_millis.rem_euclid(DAY_MILLIS)).rem_euclid(DAY_MILLIS)
}

/// The instant of the local midnight at or before `now_millis`. Saturates at
/// the bottom of the `i64` range.
pub fn local_midnight(now_millis: i64, tz_offset_millis: i64) -> i64 {
    now_millis.saturating_sub(local_time_of_day(now_millis, tz_offset_millis))
}

/// Epoch-anchored day of week in `0..7`; index 0 is the weekday of 1970-01-01 (a Thursday)
pub fn epoch_weekday_index(now_millis: i64) -> u32 {
    now_millis.div_euclid(DAY_MILLIS).rem_euclid(7) as u32
}

/// Format epoch milliseconds for logs
pub fn format_millis(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{}ms", millis),
    }
}

/// Wall-clock time of day for daily and weekly windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Returns milliseconds since midnight
    pub fn as_millis_from_midnight(&self) -> i64 {
        (self.hour as i64) * HOUR_MILLIS + (self.minute as i64) * MINUTE_MILLIS
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_millis_from_midnight()
            .cmp(&other.as_millis_from_midnight())
    }
}

impl std::fmt::Display for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Helper to format millisecond durations in human-readable form
pub fn format_duration_millis(millis: i64) -> String {
    let total_secs = millis.max(0) / SECOND_MILLIS;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
