use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wait for an interrupt or terminate signal, then cancel the process
/// shutdown token. The HTTP server drains against this token; the queue
/// connection is closed afterwards by the serve command.
pub async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c signal");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received, draining the crashgate server");

    shutdown.cancel();
}
