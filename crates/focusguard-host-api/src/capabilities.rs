//! Host capabilities model

use serde::{Deserialize, Serialize};

/// Describes what a host adapter can do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// Can draw the block overlay over other apps
    pub can_draw_overlay: bool,

    /// Can request termination of a resource's processes
    pub can_terminate: bool,

    /// Can bring the home screen to the foreground
    pub can_go_home: bool,

    /// Reports which resource is in the foreground
    pub can_observe_foreground: bool,
}

impl HostCapabilities {
    /// Foreground observation only; enforcement is limited to verdict logging
    pub fn minimal() -> Self {
        Self {
            can_draw_overlay: false,
            can_terminate: false,
            can_go_home: false,
            can_observe_foreground: true,
        }
    }

    /// Everything granted
    pub fn full() -> Self {
        Self {
            can_draw_overlay: true,
            can_terminate: true,
            can_go_home: true,
            can_observe_foreground: true,
        }
    }

    /// Whether blocks can be enforced beyond logging
    pub fn can_enforce(&self) -> bool {
        self.can_draw_overlay || self.can_go_home || self.can_terminate
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::minimal()
    }
}
