//! Registry notification payloads and the push-event filter.
//!
//! The registry posts an envelope `{"events": [...]}`. Each element describes one
//! registry action. Only pushes of legacy single-manifest (schema 1) images are
//! relayed; every other event is dropped with a debug log. Schema 2 manifests and
//! manifest lists are a known limitation, not an oversight.

use serde::Deserialize;
use serde_json::Value;

/// Action reported by the registry when a manifest has been pushed.
pub const PUSH_ACTION: &str = "push";

/// The only manifest media type the relay knows how to describe.
pub const MANIFEST_V1_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v1+json";

/// Content type the registry uses for notification envelopes.
pub const EVENTS_MEDIA_TYPE: &str = "application/vnd.docker.distribution.events.v1+json";

// ---------------------------------------------------------------------------
// Event model
// ---------------------------------------------------------------------------

/// One entry in a registry notification envelope.
///
/// Fields the relay does not use are ignored. Missing string fields default to
/// empty so that an incomplete event is filtered out rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistryEvent {
    /// Registry-assigned event identifier.
    pub id: String,

    /// Action performed (`push`, `pull`, `delete`, ...).
    pub action: String,

    /// The object the action was performed on.
    pub target: EventTarget,

    /// The request that triggered the event.
    pub request: EventRequest,
}

/// The object a registry event refers to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventTarget {
    /// Media type of the referenced object.
    pub media_type: String,

    /// Absolute URL from which the object can be fetched.
    pub url: String,

    /// Content digest, e.g. `sha256:...`.
    pub digest: String,

    /// Repository name, when the registry reports it.
    pub repository: Option<String>,

    /// Tag, when the registry reports it.
    pub tag: Option<String>,
}

/// The HTTP request to the registry that produced an event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EventRequest {
    /// HTTP method of the request (e.g. `PUT`).
    pub method: String,

    /// Externally visible registry host name the client used.
    pub host: String,
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Why an event was not relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The action was not a push.
    Action(String),
    /// The pushed object is not a schema 1 manifest.
    MediaType(String),
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action(action) => write!(f, "action: {action}"),
            Self::MediaType(media_type) => write!(f, "media type: {media_type}"),
        }
    }
}

impl RegistryEvent {
    /// Decides whether this event should be relayed to chat.
    ///
    /// # Errors
    ///
    /// Returns the [`IgnoreReason`] when the event is not a schema 1 manifest push.
    pub fn check_relayable(&self) -> Result<(), IgnoreReason> {
        if self.action != PUSH_ACTION {
            return Err(IgnoreReason::Action(self.action.clone()));
        }
        if self.target.media_type != MANIFEST_V1_MEDIA_TYPE {
            return Err(IgnoreReason::MediaType(self.target.media_type.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Extracts the events from a notification body.
///
/// Returns `None` when the body has no `events` array. Elements that cannot be
/// read as a [`RegistryEvent`] are returned as errors in their original position so
/// the caller can log them and carry on with the rest.
pub fn extract_events(body: &Value) -> Option<Vec<Result<RegistryEvent, serde_json::Error>>> {
    let events = body.get("events")?.as_array()?;
    Some(
        events
            .iter()
            .map(|event| RegistryEvent::deserialize(event))
            .collect(),
    )
}
