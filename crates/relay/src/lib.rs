//! Domain core of the registry relay.
//!
//! The relay receives notifications from a container-image registry, keeps the
//! pushes of schema 1 manifests, fetches each pushed manifest, and announces it
//! on a Slack incoming webhook. This crate holds every domain type, the rules for
//! filtering and formatting, the configuration model, and the port traits that
//! infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network I/O.
//! It defines *what* is needed ([`ManifestSource`], [`ChatNotifier`]);
//! the `registry` and `slack` crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | `RelayConfig` and its environment parsing |
//! | [`events`] | Registry notification model and push filter |
//! | [`manifest`] | `Manifest`, `ManifestSource` port, `ManifestError` |
//! | [`chat`] | `ChatMessage`, `ChatNotifier` port, `ChatError` |
//! | [`forward`] | The fetch-then-post chain for one event |
//! | [`origin`] | Origin derivation for outbound URLs |
//! | [`errors`] | Top-level error and failure-policy types |

pub mod chat;
pub mod config;
pub mod errors;
pub mod events;
pub mod forward;
pub mod manifest;
pub mod origin;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use chat::{ChatError, ChatMessage, ChatNotifier};
pub use config::{LogLevel, RelayConfig, SlackChannel};
pub use errors::{FailurePolicy, RelayError};
pub use events::{
    extract_events, EventRequest, EventTarget, IgnoreReason, RegistryEvent, EVENTS_MEDIA_TYPE,
    MANIFEST_V1_MEDIA_TYPE, PUSH_ACTION,
};
pub use forward::forward_push;
pub use manifest::{Manifest, ManifestError, ManifestSource};
pub use origin::{base_origin, rebase_on_origin};
