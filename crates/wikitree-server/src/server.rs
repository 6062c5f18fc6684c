use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tracing::info;

use crate::routes::{AppState, sidebar_routes};

pub fn router(state: AppState) -> Router {
    Router::new().merge(sidebar_routes()).with_state(state)
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = router(state);

    info!("Starting wiki sidebar server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}
