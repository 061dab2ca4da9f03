//! Registry relay entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — read the environment once into an immutable
//!    [`relay::RelayConfig`]; a missing or invalid `SLACK_URL` stops startup.
//! 2. **Wire observability** — install the `tracing-subscriber` stack (see
//!    [`observability`]).
//! 3. **Construct infrastructure** — build the registry and Slack clients and the
//!    listener's dispatcher, sharing the configuration behind an `Arc`.
//! 4. **Serve** — run the notification server until a shutdown signal arrives or,
//!    under the `abort` failure policy, until a relay task reports a fault. A fault
//!    ends the process with exit status 1 so that a supervisor restarts it.

mod observability;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use listener::{router, Dispatcher, FaultReceiver, ServerError};
use registry::RegistryClient;
use relay::RelayConfig;
use slack::SlackWebhookClient;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::from_env();
    let log_level = config.as_ref().map(|c| c.log_level).unwrap_or_default();
    let telemetry = observability::init(log_level)?;

    let outcome = run(config).await;
    if let Err(e) = &outcome {
        error!(error = %format!("{e:#}"), "Registry relay exiting");
    }

    telemetry.shutdown();
    outcome
}

async fn run(config: Result<RelayConfig, relay::RelayError>) -> anyhow::Result<()> {
    let config = Arc::new(config.context("Failed to load relay configuration")?);
    info!(
        config = %serde_json::to_string(config.as_ref())?,
        "Resolved configuration"
    );

    let manifests =
        RegistryClient::from_config(&config).context("Failed to create registry client")?;
    let chat = SlackWebhookClient::from_config(&config).context("Failed to create Slack client")?;
    let (dispatcher, mut faults) =
        Dispatcher::new(Arc::clone(&config), Arc::new(manifests), Arc::new(chat));

    let tcp = listener::bind(config.listen_addr).await?;
    let server = listener::serve(tcp, router(dispatcher), shutdown_signal());

    serve_until_fault(server, &mut faults).await
}

/// Drives `server` until it stops on its own or a relay task reports a fault.
///
/// A fault drops the server future, ending in-flight work, and comes back as an error
/// so that the process exits with status 1.
async fn serve_until_fault<S>(server: S, faults: &mut FaultReceiver) -> anyhow::Result<()>
where
    S: Future<Output = Result<(), ServerError>>,
{
    tokio::select! {
        result = server => {
            result.context("Notification server failed")?;
            info!("Registry relay stopped");
            Ok(())
        }
        Some(fault) = faults.recv() => {
            Err(anyhow::Error::new(fault).context("Relay stopped after a downstream failure"))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use relay::{ManifestError, RelayError};
    use tokio::sync::mpsc;

    use super::*;

    fn manifest_fault() -> RelayError {
        RelayError::Manifest {
            event_id: "evt-7".to_string(),
            source: ManifestError::Status {
                url: "https://registry.example.com/v2/lib/app/manifests/v1".to_string(),
                status: 500,
            },
        }
    }

    #[tokio::test]
    async fn fault_stops_a_running_server_with_an_error() {
        let (tx, mut faults) = mpsc::unbounded_channel();
        tx.send(manifest_fault()).unwrap();

        let server = std::future::pending::<Result<(), ServerError>>();
        let err = serve_until_fault(server, &mut faults).await.unwrap_err();

        assert!(format!("{err:#}").contains("evt-7"));
        assert!(matches!(
            err.downcast_ref::<RelayError>(),
            Some(RelayError::Manifest { .. })
        ));
    }

    #[tokio::test]
    async fn clean_server_exit_is_success() {
        let (_tx, mut faults) = mpsc::unbounded_channel();

        serve_until_fault(async { Ok(()) }, &mut faults).await.unwrap();
    }

    #[tokio::test]
    async fn server_failure_is_an_error() {
        let (_tx, mut faults) = mpsc::unbounded_channel();
        let server = async { Err(ServerError::Serve(std::io::Error::other("accept failed"))) };

        let err = serve_until_fault(server, &mut faults).await.unwrap_err();
        assert!(format!("{err:#}").contains("Notification server failed"));
    }
}
