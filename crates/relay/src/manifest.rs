//! Image manifests and the port through which they are fetched.
//!
//! Only the two fields needed to describe a push are read from the manifest body;
//! everything else (layers, signatures, history) is ignored.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// The parts of a schema 1 image manifest the relay uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// Repository name, e.g. `library/nginx`.
    pub name: String,
    /// Tag the manifest was pushed under, e.g. `latest`.
    pub tag: String,
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

// ---------------------------------------------------------------------------

/// Failure to retrieve a manifest from the registry.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The event's target URL cannot be addressed.
    #[error("Invalid manifest URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as supplied by the registry event.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request could not be sent or no response was received (DNS, TCP, TLS).
    #[error("Request to '{url}' failed: {message}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// Transport error description.
        message: String,
    },

    /// The registry answered with a non-success status.
    #[error("Registry returned {status} for '{url}'")]
    Status {
        /// The URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body is not a manifest.
    #[error("Manifest from '{url}' could not be decoded: {message}")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// Decoding error description.
        message: String,
    },
}

/// Source of image manifests.
///
/// Implemented over HTTP by the `registry` crate; tests use in-memory fakes.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetches the manifest located at `manifest_url` (an event's `target.url`).
    async fn fetch_manifest(&self, manifest_url: &str) -> Result<Manifest, ManifestError>;
}
