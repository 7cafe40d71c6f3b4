//! Validated configuration structures

use crate::schema::{
    RawBypassConfig, RawConfig, RawEnforcementConfig, RawMonitorConfig, RawServiceConfig,
};
use focusguard_model::BypassRule;
use focusguard_util::{ResourceId, default_data_dir};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default snapshot filename
pub const DEFAULT_STORE_FILE: &str = "block_store.json";

/// System UI and launcher ids whose foreground events carry no policy meaning
pub const DEFAULT_IGNORED_RESOURCES: &[&str] = &[
    "com.android.systemui",
    "com.android.launcher",
    "com.google.android.launcher",
    "com.android.launcher3",
    "com.sec.android.app.launcher",
    "com.android.keyguard",
    "com.google.android.apps.nexuslauncher",
    "com.oneplus.launcher",
];

pub const DEFAULT_BLOCK_MESSAGE: &str = "This app is blocked";
pub const DEFAULT_POMODORO_MESSAGE: &str = "Pomodoro Timer is running";

/// Validated configuration ready for use by the service
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub service: ServiceConfig,
    pub enforcement: EnforcementConfig,
    pub bypass: BypassConfig,
    pub monitor: MonitorConfig,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            enforcement: EnforcementConfig::from_raw(raw.enforcement),
            bypass: BypassConfig::from_raw(raw.bypass),
            monitor: MonitorConfig::from_raw(raw.monitor),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub store_file: String,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            store_file: raw
                .store_file
                .unwrap_or_else(|| DEFAULT_STORE_FILE.to_string()),
        }
    }

    /// Full path of the snapshot file
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Enforcement timing, all in milliseconds
#[derive(Debug, Clone)]
pub struct EnforcementConfig {
    pub cooldown_millis: i64,
    pub home_delay_millis: i64,
    pub overlay_timeout_millis: i64,
    pub kill_delay_millis: i64,
    pub min_kill_interval_millis: i64,
    pub home_resource: Option<ResourceId>,
    pub self_resource: Option<ResourceId>,
    pub ignored_resources: BTreeSet<ResourceId>,
    pub block_message: String,
    pub pomodoro_message: String,
}

impl EnforcementConfig {
    pub const DEFAULT_COOLDOWN_MILLIS: i64 = 500;
    pub const DEFAULT_HOME_DELAY_MILLIS: i64 = 200;
    pub const DEFAULT_OVERLAY_TIMEOUT_MILLIS: i64 = 2_000;
    pub const DEFAULT_KILL_DELAY_MILLIS: i64 = 500;
    pub const DEFAULT_MIN_KILL_INTERVAL_MILLIS: i64 = 2_000;

    fn from_raw(raw: RawEnforcementConfig) -> Self {
        // Values are bounded by validation, so the casts cannot wrap
        let ms = |value: Option<u64>, default: i64| value.map(|v| v as i64).unwrap_or(default);

        let ignored_resources = match raw.ignored_resources {
            Some(list) => list.into_iter().map(ResourceId::from).collect(),
            None => DEFAULT_IGNORED_RESOURCES
                .iter()
                .map(|id| ResourceId::from(*id))
                .collect(),
        };

        Self {
            cooldown_millis: ms(raw.cooldown_ms, Self::DEFAULT_COOLDOWN_MILLIS),
            home_delay_millis: ms(raw.home_delay_ms, Self::DEFAULT_HOME_DELAY_MILLIS),
            overlay_timeout_millis: ms(raw.overlay_timeout_ms, Self::DEFAULT_OVERLAY_TIMEOUT_MILLIS),
            kill_delay_millis: ms(raw.kill_delay_ms, Self::DEFAULT_KILL_DELAY_MILLIS),
            min_kill_interval_millis: ms(
                raw.min_kill_interval_ms,
                Self::DEFAULT_MIN_KILL_INTERVAL_MILLIS,
            ),
            home_resource: raw.home_resource.map(ResourceId::from),
            self_resource: raw.self_resource.map(ResourceId::from),
            ignored_resources,
            block_message: raw
                .block_message
                .unwrap_or_else(|| DEFAULT_BLOCK_MESSAGE.to_string()),
            pomodoro_message: raw
                .pomodoro_message
                .unwrap_or_else(|| DEFAULT_POMODORO_MESSAGE.to_string()),
        }
    }

    pub fn is_home(&self, resource: &str) -> bool {
        self.home_resource
            .as_ref()
            .is_some_and(|home| home.as_str() == resource)
    }

    /// Whether events for `resource` are dropped before any state change
    pub fn is_ignored(&self, resource: &str) -> bool {
        self.self_resource
            .as_ref()
            .is_some_and(|own| own.as_str() == resource)
            || self.ignored_resources.contains(resource)
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self::from_raw(RawEnforcementConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct BypassConfig {
    pub duration_millis: i64,
}

impl BypassConfig {
    fn from_raw(raw: RawBypassConfig) -> Self {
        Self {
            duration_millis: raw
                .duration_ms
                .map(|v| v as i64)
                .unwrap_or(BypassRule::DEFAULT_DURATION_MILLIS),
        }
    }
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self::from_raw(RawBypassConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
}

impl MonitorConfig {
    pub const DEFAULT_INTERVAL_SECS: u64 = 30;

    fn from_raw(raw: RawMonitorConfig) -> Self {
        Self {
            interval: Duration::from_secs(raw.interval_secs.unwrap_or(Self::DEFAULT_INTERVAL_SECS)),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_raw(RawMonitorConfig::default())
    }
}
