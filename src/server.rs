use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chain::Chain;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Bind the address and serve the chain until shutdown.
///
/// The chain is mounted as the router fallback so every path and method
/// flows through it; if all stages defer the chain's host default answers.
pub async fn run(address: SocketAddr, chain: Chain) -> Result<(), AnyError> {
    let app = Router::new()
        .fallback_service(chain.into_native())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(address).await?;
    info!(%address, "cascade server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
