//! Registry relay chat adapter.
//!
//! Implements the [`relay::ChatNotifier`] trait for Slack incoming webhooks (and
//! Slack-compatible endpoints such as Mattermost or Rocket.Chat).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport and response handling live here. The
//! [`relay`] crate sees only [`relay::ChatNotifier`].

use async_trait::async_trait;
use relay::{rebase_on_origin, ChatError, ChatMessage, ChatNotifier, RelayConfig};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

/// Failure to construct a [`SlackWebhookClient`].
#[derive(Debug, Error)]
pub enum SlackClientError {
    /// The webhook URL has no network origin to post to.
    #[error("Slack webhook URL '{0}' has no network origin")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be initialised.
    #[error("Failed to build Slack HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Posts chat messages to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackWebhookClient {
    /// Webhook path and query, resolved against the webhook's origin.
    webhook_url: Url,
    client: reqwest::Client,
}

impl SlackWebhookClient {
    /// Creates a client posting to `webhook_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SlackClientError::InvalidUrl`] if the URL has no host and
    /// [`SlackClientError::Build`] if the HTTP client cannot be created.
    pub fn new(webhook_url: &Url) -> Result<Self, SlackClientError> {
        let webhook_url = rebase_on_origin(webhook_url)
            .ok_or_else(|| SlackClientError::InvalidUrl(webhook_url.to_string()))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("registry-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            webhook_url,
            client,
        })
    }

    /// Creates a client for `config.slack_url`.
    ///
    /// # Errors
    ///
    /// See [`SlackWebhookClient::new`].
    pub fn from_config(config: &RelayConfig) -> Result<Self, SlackClientError> {
        Self::new(&config.slack_url)
    }
}

#[async_trait]
impl ChatNotifier for SlackWebhookClient {
    #[instrument(skip(self, message), fields(channel = ?message.channel))]
    async fn post_message(&self, message: &ChatMessage) -> Result<(), ChatError> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| ChatError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Slack accepted message");
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        error!(status = status.as_u16(), body = %body, "Slack rejected message");
        Err(ChatError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn message(channel: Option<&str>) -> ChatMessage {
        ChatMessage {
            username: "docker-registry".to_string(),
            text: "PUT <https://r.example.com/v2/a/manifests/1|r.example.com/a:1> sha256:00"
                .to_string(),
            icon_emoji: ":whale:".to_string(),
            channel: channel.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn posts_message_as_json_to_webhook_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/services/T000/B000/XXXX")
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "username": "docker-registry",
                        "text": "PUT <https://r.example.com/v2/a/manifests/1|r.example.com/a:1> sha256:00",
                        "icon_emoji": ":whale:",
                        "channel": "#deploys"
                    }));
                then.status(200).body("ok");
            })
            .await;

        let url = Url::parse(&server.url("/services/T000/B000/XXXX")).unwrap();
        let client = SlackWebhookClient::new(&url).unwrap();
        client.post_message(&message(Some("#deploys"))).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_channel_when_not_configured() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/hook").json_body(json!({
                    "username": "docker-registry",
                    "text": "PUT <https://r.example.com/v2/a/manifests/1|r.example.com/a:1> sha256:00",
                    "icon_emoji": ":whale:"
                }));
                then.status(200);
            })
            .await;

        let url = Url::parse(&server.url("/hook")).unwrap();
        let client = SlackWebhookClient::new(&url).unwrap();
        client.post_message(&message(None)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_message_reports_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/hook");
                then.status(404).body("no_service");
            })
            .await;

        let url = Url::parse(&server.url("/hook")).unwrap();
        let client = SlackWebhookClient::new(&url).unwrap();
        let err = client.post_message(&message(None)).await.unwrap_err();

        match err {
            ChatError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no_service");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_transport_error() {
        let url = Url::parse("http://127.0.0.1:1/hook").unwrap();
        let client = SlackWebhookClient::new(&url).unwrap();
        let err = client.post_message(&message(None)).await.unwrap_err();

        assert!(matches!(err, ChatError::Transport { .. }));
    }

    #[test]
    fn hostless_webhook_url_is_rejected() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(matches!(
            SlackWebhookClient::new(&url),
            Err(SlackClientError::InvalidUrl(_))
        ));
    }
}
