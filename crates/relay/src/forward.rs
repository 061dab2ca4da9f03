//! The per-event relay chain: fetch the manifest, then post the announcement.

use tracing::{debug, info, instrument};

use crate::{ChatMessage, ChatNotifier, ManifestSource, RegistryEvent, RelayConfig, RelayError};

/// Relays one qualifying push event to chat.
///
/// The caller is expected to have passed the event through
/// [`RegistryEvent::check_relayable`]. No retries are attempted.
///
/// # Errors
///
/// Returns [`RelayError::Manifest`] if the manifest cannot be fetched and
/// [`RelayError::Chat`] if the message cannot be delivered.
#[instrument(skip_all, fields(event_id = %event.id, url = %event.target.url))]
pub async fn forward_push(
    config: &RelayConfig,
    manifests: &dyn ManifestSource,
    chat: &dyn ChatNotifier,
    event: &RegistryEvent,
) -> Result<(), RelayError> {
    debug!("Requesting manifest for pushed image");
    let manifest = manifests
        .fetch_manifest(&event.target.url)
        .await
        .map_err(|source| RelayError::Manifest {
            event_id: event.id.clone(),
            source,
        })?;
    debug!(manifest = %manifest, "Retrieved manifest");

    let message = ChatMessage::for_push(config, event, &manifest);
    debug!(text = %message.text, channel = ?message.channel, "Posting message to chat");
    chat.post_message(&message)
        .await
        .map_err(|source| RelayError::Chat {
            event_id: event.id.clone(),
            source,
        })?;

    info!(image = %manifest, digest = %event.target.digest, "Relayed push notification");
    Ok(())
}
