//! HTTP surface of the relay.
//!
//! | Route | Behaviour |
//! |-------|-----------|
//! | `GET /ping` | `200 pong`, for liveness probes |
//! | `POST /docker/registry/notification` | dispatch events, always `200` with an empty body |
//!
//! The registry is never told about downstream failures: an error status would
//! make it re-deliver the notification indefinitely.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use relay::{extract_events, EVENTS_MEDIA_TYPE};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::{Dispatcher, ServerError};

/// Path of the liveness endpoint.
pub const PING_PATH: &str = "/ping";

/// Path the registry posts notifications to.
pub const NOTIFICATION_PATH: &str = "/docker/registry/notification";

/// Builds the relay's router around `dispatcher`.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route(PING_PATH, get(ping))
        .route(NOTIFICATION_PATH, post(receive_notification))
        .layer(middleware::map_request(remap_events_content_type))
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(dispatcher))
}

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server stops because of an I/O error.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Registry relay listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn ping() -> &'static str {
    "pong"
}

async fn receive_notification(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(body): Json<Value>,
) -> StatusCode {
    debug!(body = %body, "Received registry notification");

    let Some(events) = extract_events(&body) else {
        info!("Event array not found");
        return StatusCode::OK;
    };

    for (index, event) in events.into_iter().enumerate() {
        match event {
            Ok(event) => {
                dispatcher.dispatch(event);
            }
            Err(e) => warn!(index, error = %e, "Skipping unreadable event"),
        }
    }

    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Presents the registry's event media type as plain JSON to the body extractor.
async fn remap_events_content_type(mut request: Request) -> Request {
    let is_events = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(EVENTS_MEDIA_TYPE));

    if is_events {
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    request
}

async fn log_request(request: Request, next: Next) -> Response {
    debug!(
        method = %request.method(),
        path = %request.uri().path(),
        content_type = header_str(request.headers(), CONTENT_TYPE.as_str()),
        content_length = header_str(request.headers(), CONTENT_LENGTH.as_str()),
        "Incoming request"
    );
    let response = next.run(request).await;
    debug!(status = response.status().as_u16(), "Request handled");
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
