//! Listener lifecycle.

use crate::routes::{router, ApiState};
use tokio::net::TcpListener;

/// Bind the boundary's listener
pub async fn bind(address: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((address, port)).await
}

/// Serve requests on `listener` until the state's shutdown signal fires
pub async fn serve(listener: TcpListener, state: ApiState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    let mut shutdown = state.shutdown();
    tracing::info!(%addr, "api listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!(%addr, "api stopped");
    Ok(())
}
