use tokio::signal;

/// Resolves once the process receives an interrupt or terminate signal.
///
/// On Unix this races SIGINT against SIGTERM; elsewhere only Ctrl+C is
/// available. Intended to be raced against a receive loop via
/// `tokio_util::sync::CancellationToken`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
