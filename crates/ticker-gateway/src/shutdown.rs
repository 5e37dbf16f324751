//! SIGINT/SIGTERM handling: stop the tick service, then give in-flight
//! connections a bounded grace period before forcing exit.

use std::sync::Arc;
use std::time::Duration;

use ticker_scheduler::TickService;
use tracing::{error, info};

/// Resolves on the first termination signal, after the tick service has been
/// shut down. Intended for `axum::serve(..).with_graceful_shutdown(..)`.
pub async fn on_signal(ticks: Arc<TickService>, grace: Duration) {
    let signal = wait_for_signal().await;
    info!("Received {signal}. Starting graceful shutdown");

    // Closing every sink ends the SSE bodies so the server can drain.
    ticks.shutdown();

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        error!(grace_secs = grace.as_secs(), "Forced shutdown due to timeout");
        std::process::exit(1);
    });
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for SIGINT: {e}");
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
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
