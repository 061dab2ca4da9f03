//! Fire-and-forget dispatch of registry events.
//!
//! Each relayable event gets its own tokio task running [`relay::forward_push`].
//! The HTTP handler never waits for these tasks, so the registry is acknowledged
//! before any manifest fetch or chat post has completed, and events from one
//! payload may finish in any order.
//!
//! Failures are handled according to [`FailurePolicy`]. Under
//! [`FailurePolicy::Abort`] the error is sent on the fault channel; the process
//! owner receives it and shuts the relay down with a non-zero exit.

use std::sync::Arc;

use relay::{
    forward_push, ChatNotifier, FailurePolicy, ManifestSource, RegistryEvent, RelayConfig,
    RelayError,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Receiving end of the fault channel; yields errors that must stop the process.
pub type FaultReceiver = mpsc::UnboundedReceiver<RelayError>;

/// Spawns one relay task per qualifying registry event.
///
/// Cheap to clone; all state is shared and read-only.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<RelayConfig>,
    manifests: Arc<dyn ManifestSource>,
    chat: Arc<dyn ChatNotifier>,
    faults: mpsc::UnboundedSender<RelayError>,
}

impl Dispatcher {
    /// Creates a dispatcher and the receiver on which fatal faults are reported.
    pub fn new(
        config: Arc<RelayConfig>,
        manifests: Arc<dyn ManifestSource>,
        chat: Arc<dyn ChatNotifier>,
    ) -> (Self, FaultReceiver) {
        let (faults, fault_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            config,
            manifests,
            chat,
            faults,
        };
        (dispatcher, fault_rx)
    }

    /// Filters `event` and, if it is a schema 1 push, spawns its relay task.
    ///
    /// Returns the task handle, or `None` when the event was ignored.
    pub fn dispatch(&self, event: RegistryEvent) -> Option<JoinHandle<()>> {
        if let Err(reason) = event.check_relayable() {
            debug!(event_id = %event.id, %reason, "Ignoring event");
            return None;
        }
        debug!(
            event_id = %event.id,
            url = %event.target.url,
            repository = event.target.repository.as_deref().unwrap_or_default(),
            tag = event.target.tag.as_deref().unwrap_or_default(),
            "Event for manifest push"
        );

        let config = Arc::clone(&self.config);
        let manifests = Arc::clone(&self.manifests);
        let chat = Arc::clone(&self.chat);
        let faults = self.faults.clone();

        Some(tokio::spawn(async move {
            let result = forward_push(&config, manifests.as_ref(), chat.as_ref(), &event).await;
            if let Err(e) = result {
                report_failure(config.failure_policy, &faults, e);
            }
        }))
    }
}

fn report_failure(
    policy: FailurePolicy,
    faults: &mpsc::UnboundedSender<RelayError>,
    err: RelayError,
) {
    if !policy.is_fatal() {
        error!(error = %err, %policy, "Relay failed; notification dropped");
        return;
    }

    error!(error = %err, %policy, "Relay failed; stopping process");
    if let Err(unsent) = faults.send(err) {
        error!(error = %unsent.0, "Fault channel closed; failure not propagated");
    }
}
