//! Top-level error and failure-policy types for the registry relay.
//!
//! [`RelayError`] covers conditions that stop a notification from being relayed,
//! plus the startup configuration failure. Component-level errors (manifest
//! fetch, chat delivery) are defined next to their ports in [`crate::manifest`]
//! and [`crate::chat`] and wrapped here with the event they belong to.
//!
//! [`FailurePolicy`] is a cross-cutting concern: it decides what the process does
//! once a downstream call has failed.

use serde::Serialize;
use thiserror::Error;

use crate::{ChatError, ManifestError};

// ---------------------------------------------------------------------------
// Failure semantics
// ---------------------------------------------------------------------------

/// What the relay does when a manifest fetch or chat post fails.
///
/// Downstream failures are never reported to the registry (it always receives
/// `200`); this policy only governs the relay process itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Terminate the whole process with a non-zero exit status.
    ///
    /// A supervisor (systemd, Kubernetes, Docker restart policy) is expected to
    /// restart the relay. A failed notification is therefore never silently lost:
    /// it surfaces as a crash.
    #[default]
    Abort,
    /// Log the failure and drop that one notification; keep serving.
    Isolate,
}

impl FailurePolicy {
    /// Parses a policy name, ignoring ASCII case.
    ///
    /// Returns `None` for anything other than `abort` or `isolate`.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("abort") {
            Some(Self::Abort)
        } else if value.eq_ignore_ascii_case("isolate") {
            Some(Self::Isolate)
        } else {
            None
        }
    }

    /// Returns `true` if a downstream failure must bring the process down.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Abort)
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Isolate => write!(f, "isolate"),
        }
    }
}

// ---------------------------------------------------------------------------
// Relay-level errors
// ---------------------------------------------------------------------------

/// Errors that stop the relay from starting or from forwarding one event.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The process environment does not describe a usable configuration.
    ///
    /// Produced at startup only; the server never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The manifest for a pushed image could not be retrieved from the registry.
    #[error("Event {event_id}: manifest fetch failed: {source}")]
    Manifest {
        /// Registry-assigned identifier of the event being relayed.
        event_id: String,
        /// Underlying fetch failure.
        source: ManifestError,
    },

    /// The chat message for a pushed image could not be delivered.
    #[error("Event {event_id}: chat delivery failed: {source}")]
    Chat {
        /// Registry-assigned identifier of the event being relayed.
        event_id: String,
        /// Underlying delivery failure.
        source: ChatError,
    },
}

impl RelayError {
    /// Returns the identifier of the event this error relates to, if any.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Configuration { .. } => None,
            Self::Manifest { event_id, .. } | Self::Chat { event_id, .. } => Some(event_id),
        }
    }
}
