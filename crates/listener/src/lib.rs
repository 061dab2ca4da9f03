//! Registry relay event source infrastructure.
//!
//! Receives Docker registry notifications over HTTP and hands every qualifying
//! event to a [`Dispatcher`], which runs the relay chain in its own task.
//!
//! - [`server`] — the `axum` router (`/ping`, `/docker/registry/notification`)
//!   and the serve loop.
//! - [`dispatch`] — per-event task spawning and failure-policy enforcement.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and payload decoding live here. The
//! [`relay`] crate supplies the event model, the filter, and the relay chain.
//!
//! ## Concurrency
//!
//! The handler acknowledges the registry as soon as every event has been
//! dispatched; it never waits for an outbound call. No state is written after
//! startup, so no locking is involved.

pub mod dispatch;
pub mod server;

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

pub use dispatch::{Dispatcher, FaultReceiver};
pub use server::{router, serve, NOTIFICATION_PATH, PING_PATH};

/// Errors raised while running the notification server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be opened.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The server loop terminated with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Opens the listening socket for the relay.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if `addr` cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}
