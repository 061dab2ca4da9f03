//! Relay configuration resolved from the process environment.
//!
//! The configuration is read exactly once at startup and is immutable afterwards;
//! components receive it by reference (usually behind an `Arc`). Only `SLACK_URL`
//! is mandatory. Every optional variable that is missing or invalid silently falls
//! back to its default.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SLACK_URL` | required |
//! | `REGISTRY_SELF_SIGNED` | `false` |
//! | `SLACK_CHANNEL` | none (webhook default channel) |
//! | `SLACK_USER` | `docker-registry` |
//! | `SLACK_ICON` | `:whale:` |
//! | `LOG_LEVEL` | `info` |
//! | `LISTEN_ADDR` | `0.0.0.0:8080` |
//! | `RELAY_FAILURE_POLICY` | `abort` |

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::{FailurePolicy, RelayError};

/// Names of the environment variables the relay reads.
pub mod vars {
    pub const SLACK_URL: &str = "SLACK_URL";
    pub const REGISTRY_SELF_SIGNED: &str = "REGISTRY_SELF_SIGNED";
    pub const SLACK_CHANNEL: &str = "SLACK_CHANNEL";
    pub const SLACK_USER: &str = "SLACK_USER";
    pub const SLACK_ICON: &str = "SLACK_ICON";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LISTEN_ADDR: &str = "LISTEN_ADDR";
    pub const FAILURE_POLICY: &str = "RELAY_FAILURE_POLICY";
}

/// Display name used for chat messages when `SLACK_USER` is not set.
pub const DEFAULT_SLACK_USER: &str = "docker-registry";

/// Icon used for chat messages when `SLACK_ICON` is not set.
pub const DEFAULT_SLACK_ICON: &str = ":whale:";

/// Port the relay listens on when `LISTEN_ADDR` is not set.
pub const DEFAULT_PORT: u16 = 8080;

static CHANNEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[A-Za-z0-9_-]+$").expect("channel pattern is a valid regex")
});

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// A Slack channel override such as `#deploys`.
///
/// Must start with `#` followed by one or more word characters or dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SlackChannel(String);

impl SlackChannel {
    /// Creates a channel, returning `None` if `value` is not of the form `#name`.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if CHANNEL_PATTERN.is_match(&v) {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the channel as a string slice, including the leading `#`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SlackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Log verbosity accepted in `LOG_LEVEL`.
///
/// The names are matched exactly (lower case). `fatal` has no direct
/// counterpart in `tracing` and is treated as `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses one of `fatal`, `error`, `warn`, `info`, `debug`, `trace`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fatal" => Some(Self::Fatal),
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Returns the equivalent `tracing` filter directive.
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            Self::Fatal | Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable, process-lifetime relay configuration.
///
/// Serialisable so that the resolved values can be logged once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayConfig {
    /// Slack incoming-webhook URL. Trusted as-is once it parses.
    pub slack_url: Url,

    /// When `true`, the registry's TLS certificate is not verified.
    ///
    /// Applies to manifest fetches only; Slack calls always verify.
    pub registry_self_signed: bool,

    /// Channel override sent with every message.
    ///
    /// `None` lets the webhook post to its configured default channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_channel: Option<SlackChannel>,

    /// Display name of the message author.
    pub slack_user: String,

    /// Emoji shown as the message author's avatar.
    pub slack_icon: String,

    /// Log verbosity.
    pub log_level: LogLevel,

    /// Address the notification server binds to.
    pub listen_addr: SocketAddr,

    /// Process behaviour after a failed manifest fetch or chat post.
    pub failure_policy: FailurePolicy,
}

impl RelayConfig {
    /// Builds a configuration with defaults for every optional field.
    pub fn new(slack_url: Url) -> Self {
        Self {
            slack_url,
            registry_self_signed: false,
            slack_channel: None,
            slack_user: DEFAULT_SLACK_USER.to_string(),
            slack_icon: DEFAULT_SLACK_ICON.to_string(),
            log_level: LogLevel::default(),
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Configuration`] if `SLACK_URL` is missing or is not an
    /// absolute URL with a host.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the configuration through `lookup`, which maps a variable name to
    /// its value (or `None` when unset).
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(vars::SLACK_URL).ok_or_else(|| RelayError::Configuration {
            message: format!("{} is not set", vars::SLACK_URL),
        })?;
        let slack_url = Url::parse(&raw_url).map_err(|e| RelayError::Configuration {
            message: format!("{} is not a valid URL: {e}", vars::SLACK_URL),
        })?;
        if !slack_url.has_host() {
            return Err(RelayError::Configuration {
                message: format!("{} has no host: {slack_url}", vars::SLACK_URL),
            });
        }

        let mut config = Self::new(slack_url);

        config.registry_self_signed = lookup(vars::REGISTRY_SELF_SIGNED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if let Some(channel) = lookup(vars::SLACK_CHANNEL).and_then(SlackChannel::new) {
            config.slack_channel = Some(channel);
        }
        if let Some(user) = lookup(vars::SLACK_USER).filter(|v| !v.is_empty()) {
            config.slack_user = user;
        }
        if let Some(icon) = lookup(vars::SLACK_ICON).filter(|v| !v.is_empty()) {
            config.slack_icon = icon;
        }
        if let Some(level) = lookup(vars::LOG_LEVEL).as_deref().and_then(LogLevel::parse) {
            config.log_level = level;
        }
        if let Some(addr) = lookup(vars::LISTEN_ADDR).and_then(|v| v.parse().ok()) {
            config.listen_addr = addr;
        }
        if let Some(policy) = lookup(vars::FAILURE_POLICY)
            .as_deref()
            .and_then(FailurePolicy::parse)
        {
            config.failure_policy = policy;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const HOOK: &str = "https://hooks.slack.com/services/T000/B000/XXXX";

    fn resolve(pairs: &[(&str, &str)]) -> Result<RelayConfig, RelayError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RelayConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn missing_slack_url_is_a_configuration_error() {
        let err = resolve(&[]).unwrap_err();
        assert!(matches!(err, RelayError::Configuration { .. }));
        assert!(err.to_string().contains("SLACK_URL"));
    }

    #[test]
    fn unparsable_slack_url_is_a_configuration_error() {
        let err = resolve(&[(vars::SLACK_URL, "not a url")]).unwrap_err();
        assert!(matches!(err, RelayError::Configuration { .. }));

        let err = resolve(&[(vars::SLACK_URL, "mailto:ops@example.com")]).unwrap_err();
        assert!(err.to_string().contains("no host"));
    }

    #[test]
    fn defaults_apply_when_only_slack_url_is_set() {
        let config = resolve(&[(vars::SLACK_URL, HOOK)]).unwrap();
        assert_eq!(config.slack_url.as_str(), HOOK);
        assert!(!config.registry_self_signed);
        assert_eq!(config.slack_channel, None);
        assert_eq!(config.slack_user, "docker-registry");
        assert_eq!(config.slack_icon, ":whale:");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn overrides_are_applied_when_valid() {
        let config = resolve(&[
            (vars::SLACK_URL, HOOK),
            (vars::REGISTRY_SELF_SIGNED, "TRUE"),
            (vars::SLACK_CHANNEL, "#deploys"),
            (vars::SLACK_USER, "registry-bot"),
            (vars::SLACK_ICON, ":package:"),
            (vars::LOG_LEVEL, "debug"),
            (vars::LISTEN_ADDR, "127.0.0.1:9000"),
            (vars::FAILURE_POLICY, "isolate"),
        ])
        .unwrap();

        assert!(config.registry_self_signed);
        assert_eq!(config.slack_channel.as_ref().map(|c| c.as_str()), Some("#deploys"));
        assert_eq!(config.slack_user, "registry-bot");
        assert_eq!(config.slack_icon, ":package:");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn invalid_optional_values_fall_back_to_defaults() {
        let config = resolve(&[
            (vars::SLACK_URL, HOOK),
            (vars::REGISTRY_SELF_SIGNED, "yes"),
            (vars::SLACK_CHANNEL, "notachannel"),
            (vars::SLACK_USER, ""),
            (vars::SLACK_ICON, ""),
            (vars::LOG_LEVEL, "verbose"),
            (vars::LISTEN_ADDR, "localhost"),
            (vars::FAILURE_POLICY, "retry"),
        ])
        .unwrap();

        assert_eq!(config, RelayConfig::new(Url::parse(HOOK).unwrap()));
    }

    #[test]
    fn channel_requires_leading_hash_and_word_characters() {
        assert!(SlackChannel::new("#deploys").is_some());
        assert!(SlackChannel::new("#team-ops_2").is_some());
        assert!(SlackChannel::new("deploys").is_none());
        assert!(SlackChannel::new("#").is_none());
        assert!(SlackChannel::new("#two words").is_none());
        assert!(SlackChannel::new("#deploys\n").is_none());
    }

    #[test]
    fn log_level_is_case_sensitive_and_maps_fatal_to_error() {
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("DEBUG"), None);
        assert_eq!(LogLevel::Fatal.as_filter_directive(), "error");
        assert_eq!(LogLevel::Warn.as_filter_directive(), "warn");
        assert_eq!(LogLevel::Fatal.to_string(), "fatal");
    }

    #[test]
    fn configuration_serialises_without_absent_channel() {
        let config = resolve(&[(vars::SLACK_URL, HOOK)]).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("slack_channel").is_none());
        assert_eq!(json["slack_user"], "docker-registry");
        assert_eq!(json["log_level"], "info");
        assert_eq!(json["failure_policy"], "abort");
    }
}
