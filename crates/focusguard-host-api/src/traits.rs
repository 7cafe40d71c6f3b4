//! Host adapter traits

use async_trait::async_trait;
use focusguard_util::ResourceId;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::HostCapabilities;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Overlay failed: {0}")]
    OverlayFailed(String),

    #[error("Termination failed for {resource}: {message}")]
    TerminateFailed { resource: ResourceId, message: String },

    #[error("Not supported by this host")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

impl From<HostError> for focusguard_util::FocusError {
    fn from(e: HostError) -> Self {
        focusguard_util::FocusError::host(e.to_string())
    }
}

/// Events from the host adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A resource came to the foreground
    Foreground { resource: ResourceId, at_millis: i64 },

    /// The home screen came to the foreground
    Home { at_millis: i64 },

    /// The event source has closed; no further events will arrive
    Closed,
}

impl HostEvent {
    pub fn at_millis(&self) -> Option<i64> {
        match self {
            HostEvent::Foreground { at_millis, .. } | HostEvent::Home { at_millis } => Some(*at_millis),
            HostEvent::Closed => None,
        }
    }
}

/// Host adapter trait - implemented by platform-specific adapters
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Get the capabilities of this host adapter
    fn capabilities(&self) -> &HostCapabilities;

    /// Display the overlay with `message`
    async fn show_overlay(&self, message: &str) -> HostResult<()>;

    /// Replace the message of a showing overlay
    async fn update_overlay(&self, message: &str) -> HostResult<()>;

    /// Remove the overlay if showing
    async fn hide_overlay(&self) -> HostResult<()>;

    fn is_overlay_showing(&self) -> bool;

    /// Bring the home screen to the foreground
    async fn go_home(&self) -> HostResult<()>;

    /// Request termination of all processes of `resource`
    async fn terminate(&self, resource: &ResourceId) -> HostResult<()>;

    /// Subscribe to host events. Only the first call returns a receiver.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>>;

    /// Optional: check if the host adapter is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}

/// One-shot wake-up at an absolute instant.
///
/// Arming replaces any pending wake-up; there is at most one at a time.
pub trait WakeScheduler: Send + Sync {
    fn arm(&self, at_millis: i64);

    fn cancel(&self);

    /// The pending wake-up, if any
    fn armed_at(&self) -> Option<i64>;
}
