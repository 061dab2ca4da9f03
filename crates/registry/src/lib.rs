//! Registry relay manifest source adapter.
//!
//! Implements the [`relay::ManifestSource`] trait over the registry's HTTP API.
//! The URL to fetch comes straight from the registry event (`target.url`); the
//! request is addressed as that URL's path against its origin and asks for JSON,
//! which makes a v2 registry serve the schema 1 manifest.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, TLS policy, status handling, and body
//! decoding live here. The [`relay`] crate sees only [`relay::ManifestSource`].
//!
//! ## TLS
//!
//! Registries are often deployed with self-signed certificates. When
//! `REGISTRY_SELF_SIGNED=true` the client built here skips certificate
//! verification. The setting is scoped to this client; the Slack client is built
//! separately and always verifies.
//!
//! ## Trust
//!
//! `target.url` is fetched without checking that it points at the registry that
//! sent the notification. Anyone able to post to the notification endpoint can make
//! the relay issue a GET to an arbitrary host.

use async_trait::async_trait;
use relay::{rebase_on_origin, Manifest, ManifestError, ManifestSource, RelayConfig};
use reqwest::header::ACCEPT;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Failure to construct a [`RegistryClient`].
#[derive(Debug, Error)]
pub enum RegistryClientError {
    /// The underlying HTTP client could not be initialised (e.g. TLS backend).
    #[error("Failed to build registry HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Fetches image manifests from a Docker registry over HTTP.
///
/// Holds one long-lived connection pool shared by every event.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    accept_invalid_certs: bool,
}

impl RegistryClient {
    /// Creates a client. `accept_invalid_certs` disables TLS certificate checks.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryClientError::Build`] if the HTTP client cannot be created.
    pub fn new(accept_invalid_certs: bool) -> Result<Self, RegistryClientError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(concat!("registry-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            accept_invalid_certs,
        })
    }

    /// Creates a client honouring `config.registry_self_signed`.
    ///
    /// # Errors
    ///
    /// See [`RegistryClient::new`].
    pub fn from_config(config: &RelayConfig) -> Result<Self, RegistryClientError> {
        Self::new(config.registry_self_signed)
    }
}

#[async_trait]
impl ManifestSource for RegistryClient {
    #[instrument(skip(self), fields(accept_invalid_certs = self.accept_invalid_certs))]
    async fn fetch_manifest(&self, manifest_url: &str) -> Result<Manifest, ManifestError> {
        let parsed = Url::parse(manifest_url).map_err(|e| ManifestError::InvalidUrl {
            url: manifest_url.to_string(),
            reason: e.to_string(),
        })?;
        let request_url = rebase_on_origin(&parsed).ok_or_else(|| ManifestError::InvalidUrl {
            url: manifest_url.to_string(),
            reason: "URL has no network origin".to_string(),
        })?;

        debug!(request_url = %request_url, "Requesting manifest from registry");
        let response = self
            .client
            .get(request_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ManifestError::Transport {
                url: manifest_url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManifestError::Status {
                url: manifest_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| ManifestError::Transport {
            url: manifest_url.to_string(),
            message: e.to_string(),
        })?;
        let manifest: Manifest =
            serde_json::from_slice(&body).map_err(|e| ManifestError::Decode {
                url: manifest_url.to_string(),
                message: e.to_string(),
            })?;

        debug!(manifest = %manifest, "Retrieved manifest");
        Ok(manifest)
    }
}
