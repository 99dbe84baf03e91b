//! OS signal handling.
//!
//! SIGINT and SIGTERM both trigger a graceful shutdown.

use std::sync::Arc;

use crate::lifecycle::shutdown::Shutdown;

/// Resolve once SIGINT or SIGTERM arrives.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

/// Trigger `shutdown` on the first signal.
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!(subscribers = shutdown.receiver_count(), "Shutdown signal received");
        shutdown.trigger();
    });
}
