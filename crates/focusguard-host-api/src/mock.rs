//! Mock host adapter and wake scheduler for testing

use async_trait::async_trait;
use focusguard_util::ResourceId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::{HostAdapter, HostCapabilities, HostError, HostEvent, HostResult, WakeScheduler};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A side effect requested of the mock host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    ShowOverlay(String),
    UpdateOverlay(String),
    HideOverlay,
    GoHome,
    Terminate(ResourceId),
}

/// Mock host adapter for unit/integration testing
pub struct MockHost {
    capabilities: HostCapabilities,
    calls: Arc<Mutex<Vec<HostCall>>>,
    overlay_showing: AtomicBool,
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>,

    /// Configure overlay display to fail
    pub fail_overlay: AtomicBool,

    /// Configure termination to fail
    pub fail_terminate: AtomicBool,
}

impl MockHost {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            capabilities: HostCapabilities::full(),
            calls: Arc::new(Mutex::new(Vec::new())),
            overlay_showing: AtomicBool::new(false),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
            fail_overlay: AtomicBool::new(false),
            fail_terminate: AtomicBool::new(false),
        }
    }

    pub fn with_capabilities(mut self, caps: HostCapabilities) -> Self {
        self.capabilities = caps;
        self
    }

    /// Every side effect requested so far, in order
    pub fn calls(&self) -> Vec<HostCall> {
        lock(&self.calls).clone()
    }

    pub fn take_calls(&self) -> Vec<HostCall> {
        std::mem::take(&mut *lock(&self.calls))
    }

    pub fn terminated(&self) -> Vec<ResourceId> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                HostCall::Terminate(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Simulate a foreground change
    pub fn emit(&self, event: HostEvent) {
        let _ = self.event_tx.send(event);
    }

    fn record(&self, call: HostCall) {
        lock(&self.calls).push(call);
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostAdapter for MockHost {
    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    async fn show_overlay(&self, message: &str) -> HostResult<()> {
        if self.fail_overlay.load(Ordering::SeqCst) {
            return Err(HostError::OverlayFailed("Mock overlay failure".into()));
        }
        self.record(HostCall::ShowOverlay(message.to_string()));
        self.overlay_showing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update_overlay(&self, message: &str) -> HostResult<()> {
        if !self.overlay_showing.load(Ordering::SeqCst) {
            return self.show_overlay(message).await;
        }
        self.record(HostCall::UpdateOverlay(message.to_string()));
        Ok(())
    }

    async fn hide_overlay(&self) -> HostResult<()> {
        self.record(HostCall::HideOverlay);
        self.overlay_showing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_overlay_showing(&self) -> bool {
        self.overlay_showing.load(Ordering::SeqCst)
    }

    async fn go_home(&self) -> HostResult<()> {
        self.record(HostCall::GoHome);
        Ok(())
    }

    async fn terminate(&self, resource: &ResourceId) -> HostResult<()> {
        if self.fail_terminate.load(Ordering::SeqCst) {
            return Err(HostError::TerminateFailed {
                resource: resource.clone(),
                message: "Mock terminate failure".into(),
            });
        }
        self.record(HostCall::Terminate(resource.clone()));
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>> {
        lock(&self.event_rx).take()
    }
}

/// Wake scheduler that only records what was armed
#[derive(Debug, Default)]
pub struct MockWakeScheduler {
    armed: Mutex<Option<i64>>,
    history: Mutex<Vec<Option<i64>>>,
}

impl MockWakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every arm (`Some`) and cancel (`None`) in order
    pub fn history(&self) -> Vec<Option<i64>> {
        lock(&self.history).clone()
    }
}

impl WakeScheduler for MockWakeScheduler {
    fn arm(&self, at_millis: i64) {
        *lock(&self.armed) = Some(at_millis);
        lock(&self.history).push(Some(at_millis));
    }

    fn cancel(&self) {
        *lock(&self.armed) = None;
        lock(&self.history).push(None);
    }

    fn armed_at(&self) -> Option<i64> {
        *lock(&self.armed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_side_effects() {
        let host = MockHost::new();
        host.show_overlay("blocked").await.unwrap();
        host.update_overlay("still blocked").await.unwrap();
        host.go_home().await.unwrap();
        host.terminate(&ResourceId::new("app.a")).await.unwrap();
        host.hide_overlay().await.unwrap();

        assert_eq!(
            host.calls(),
            vec![
                HostCall::ShowOverlay("blocked".into()),
                HostCall::UpdateOverlay("still blocked".into()),
                HostCall::GoHome,
                HostCall::Terminate(ResourceId::new("app.a")),
                HostCall::HideOverlay,
            ]
        );
        assert!(!host.is_overlay_showing());
    }

    #[tokio::test]
    async fn overlay_failure() {
        let host = MockHost::new();
        host.fail_overlay.store(true, Ordering::SeqCst);
        assert!(host.show_overlay("blocked").await.is_err());
        assert!(!host.is_overlay_showing());
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn subscribe_once() {
        let host = MockHost::new();
        let mut rx = host.subscribe().unwrap();
        assert!(host.subscribe().is_none());

        host.emit(HostEvent::Home { at_millis: 1 });
        assert_eq!(rx.recv().await, Some(HostEvent::Home { at_millis: 1 }));
    }

    #[test]
    fn wake_scheduler_keeps_one_pending() {
        let wake = MockWakeScheduler::new();
        wake.arm(10);
        wake.arm(20);
        assert_eq!(wake.armed_at(), Some(20));
        wake.cancel();
        assert_eq!(wake.armed_at(), None);
        assert_eq!(wake.history(), vec![Some(10), Some(20), None]);
    }
}
