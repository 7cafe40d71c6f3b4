//! Carrying out enforcement actions on a host adapter

use focusguard_host_api::HostAdapter;
use tracing::{debug, warn};

use crate::{EnforcementAction, Enforcer};

/// Execute `actions` in order against `host`.
///
/// Host failures are logged and never abort the remaining actions. A failed
/// overlay display is reported back to the enforcer so the next block shows
/// it afresh instead of updating an overlay that never appeared.
pub async fn execute_actions(
    host: &dyn HostAdapter,
    enforcer: &mut Enforcer,
    actions: Vec<EnforcementAction>,
) {
    for action in actions {
        debug!(?action, "Executing enforcement action");
        match action {
            EnforcementAction::ShowOverlay { message, .. } => {
                if let Err(e) = host.show_overlay(&message).await {
                    warn!(error = %e, "Failed to show overlay");
                    enforcer.overlay_failed();
                }
            }
            EnforcementAction::UpdateOverlay { message, .. } => {
                if let Err(e) = host.update_overlay(&message).await {
                    warn!(error = %e, "Failed to update overlay");
                    enforcer.overlay_failed();
                }
            }
            EnforcementAction::HideOverlay => {
                if let Err(e) = host.hide_overlay().await {
                    warn!(error = %e, "Failed to hide overlay");
                }
            }
            EnforcementAction::SendHome { resource } => {
                if let Err(e) = host.go_home().await {
                    warn!(resource = %resource, error = %e, "Failed to go home");
                }
            }
            EnforcementAction::Terminate { resource } => {
                if let Err(e) = host.terminate(&resource).await {
                    warn!(resource = %resource, error = %e, "Failed to terminate");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusguard_config::EnforcementConfig;
    use focusguard_host_api::{HostCall, MockHost};
    use focusguard_store::{BlockRepository, MemoryStore};
    use focusguard_util::ResourceId;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn enforcer(host: &MockHost) -> Enforcer {
        let repository = BlockRepository::new(Arc::new(MemoryStore::new()));
        Enforcer::new(
            repository,
            EnforcementConfig::default(),
            host.capabilities().clone(),
        )
    }

    #[tokio::test]
    async fn test_actions_reach_host_in_order() {
        let host = MockHost::new();
        let mut enforcer = enforcer(&host);
        let app = ResourceId::new("app.a");

        execute_actions(
            &host,
            &mut enforcer,
            vec![
                EnforcementAction::ShowOverlay {
                    kind: crate::OverlayKind::Block,
                    message: "blocked".into(),
                },
                EnforcementAction::SendHome { resource: app.clone() },
                EnforcementAction::Terminate { resource: app.clone() },
                EnforcementAction::HideOverlay,
            ],
        )
        .await;

        assert_eq!(
            host.calls(),
            vec![
                HostCall::ShowOverlay("blocked".into()),
                HostCall::GoHome,
                HostCall::Terminate(app),
                HostCall::HideOverlay,
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_actions() {
        let host = MockHost::new();
        host.fail_overlay.store(true, Ordering::SeqCst);
        host.fail_terminate.store(true, Ordering::SeqCst);
        let mut enforcer = enforcer(&host);
        let app = ResourceId::new("app.a");

        execute_actions(
            &host,
            &mut enforcer,
            vec![
                EnforcementAction::ShowOverlay {
                    kind: crate::OverlayKind::Block,
                    message: "blocked".into(),
                },
                EnforcementAction::Terminate { resource: app.clone() },
                EnforcementAction::SendHome { resource: app },
            ],
        )
        .await;

        assert_eq!(host.calls(), vec![HostCall::GoHome]);
        assert!(!enforcer.is_overlay_showing());
    }
}
