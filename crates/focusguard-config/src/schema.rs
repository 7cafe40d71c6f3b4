//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Enforcement timing and messages
    #[serde(default)]
    pub enforcement: RawEnforcementConfig,

    /// Emergency bypass settings
    #[serde(default)]
    pub bypass: RawBypassConfig,

    /// Periodic housekeeping
    #[serde(default)]
    pub monitor: RawMonitorConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the snapshot file
    pub data_dir: Option<PathBuf>,

    /// Snapshot filename inside `data_dir` (default: block_store.json)
    pub store_file: Option<String>,
}

/// Enforcement settings. All durations in milliseconds.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEnforcementConfig {
    /// Per-resource debounce between enforcements
    pub cooldown_ms: Option<u64>,

    /// Delay between showing the overlay and sending the user home
    pub home_delay_ms: Option<u64>,

    /// How long the block overlay stays up
    pub overlay_timeout_ms: Option<u64>,

    /// Gap between consecutive terminations
    pub kill_delay_ms: Option<u64>,

    /// Minimum interval between terminations of the same resource
    pub min_kill_interval_ms: Option<u64>,

    /// Resource id of the home screen
    pub home_resource: Option<String>,

    /// Our own resource id; events for it are ignored
    pub self_resource: Option<String>,

    /// System UI resources whose events are ignored
    pub ignored_resources: Option<Vec<String>>,

    pub block_message: Option<String>,

    pub pomodoro_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBypassConfig {
    /// Length of an emergency bypass
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMonitorConfig {
    /// Seconds between housekeeping passes
    pub interval_secs: Option<u64>,
}
