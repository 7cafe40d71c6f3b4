//! Side effects requested by the enforcement state machine

use focusguard_util::ResourceId;
use serde::Serialize;

/// What an overlay is being shown for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Block,
    Pomodoro,
}

/// Actions for the host adapter to carry out, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Display the overlay
    ShowOverlay { kind: OverlayKind, message: String },

    /// Replace the message of the overlay already showing
    UpdateOverlay { kind: OverlayKind, message: String },

    HideOverlay,

    /// Return to the home screen, away from `resource`
    SendHome { resource: ResourceId },

    /// Terminate the processes of `resource`
    Terminate { resource: ResourceId },
}

impl EnforcementAction {
    pub fn is_overlay(&self) -> bool {
        matches!(
            self,
            EnforcementAction::ShowOverlay { .. }
                | EnforcementAction::UpdateOverlay { .. }
                | EnforcementAction::HideOverlay
        )
    }
}
