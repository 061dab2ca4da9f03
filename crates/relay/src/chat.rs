//! Chat messages announcing pushes, and the port through which they are posted.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::{Manifest, RegistryEvent, RelayConfig};

/// Message body accepted by a Slack incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Author display name.
    pub username: String,

    /// Message text in Slack markup.
    pub text: String,

    /// Author avatar emoji.
    pub icon_emoji: String,

    /// Channel override; omitted so the webhook's default channel applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ChatMessage {
    /// Builds the announcement for a pushed manifest.
    ///
    /// The text reads `METHOD <url|host/name:tag> digest`, where the middle part is
    /// a Slack link to the manifest.
    pub fn for_push(config: &RelayConfig, event: &RegistryEvent, manifest: &Manifest) -> Self {
        let text = format!(
            "{} <{}|{}/{}> {}",
            event.request.method,
            event.target.url,
            event.request.host,
            manifest,
            event.target.digest
        );

        Self {
            username: config.slack_user.clone(),
            text,
            icon_emoji: config.slack_icon.clone(),
            channel: config.slack_channel.as_ref().map(|c| c.as_str().to_string()),
        }
    }
}

// ---------------------------------------------------------------------------

/// Failure to deliver a chat message.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request could not be sent or no response was received.
    #[error("Chat webhook request failed: {message}")]
    Transport {
        /// Transport error description.
        message: String,
    },

    /// The webhook answered with a non-success status.
    #[error("Chat webhook returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text, for diagnosis.
        body: String,
    },
}

/// Destination for chat messages.
///
/// Implemented over HTTP by the `slack` crate; tests use in-memory fakes.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Posts `message` to the chat service.
    async fn post_message(&self, message: &ChatMessage) -> Result<(), ChatError>;
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::{EventRequest, EventTarget, SlackChannel};

    fn config() -> RelayConfig {
        RelayConfig::new(Url::parse("https://hooks.slack.com/services/T/B/X").unwrap())
    }

    fn event() -> RegistryEvent {
        RegistryEvent {
            id: "evt-1".to_string(),
            action: "push".to_string(),
            target: EventTarget {
                media_type: crate::MANIFEST_V1_MEDIA_TYPE.to_string(),
                url: "https://registry.example.com/v2/lib/app/manifests/v1".to_string(),
                digest: "sha256:0123".to_string(),
                ..EventTarget::default()
            },
            request: EventRequest {
                method: "PUT".to_string(),
                host: "registry.example.com".to_string(),
                ..EventRequest::default()
            },
            ..RegistryEvent::default()
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            name: "lib/app".to_string(),
            tag: "v1".to_string(),
        }
    }

    #[test]
    fn push_text_links_to_the_manifest() {
        let message = ChatMessage::for_push(&config(), &event(), &manifest());

        assert_eq!(
            message.text,
            "PUT <https://registry.example.com/v2/lib/app/manifests/v1\
             |registry.example.com/lib/app:v1> sha256:0123"
        );
        assert_eq!(message.username, "docker-registry");
        assert_eq!(message.icon_emoji, ":whale:");
        assert_eq!(message.channel, None);
    }

    #[test]
    fn channel_is_serialised_only_when_configured() {
        let message = ChatMessage::for_push(&config(), &event(), &manifest());
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("channel").is_none());
        assert_eq!(json["icon_emoji"], ":whale:");

        let mut config = config();
        config.slack_channel = SlackChannel::new("#deploys");
        let message = ChatMessage::for_push(&config, &event(), &manifest());
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["channel"], "#deploys");
    }
}
