use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use counsel_backend::state::AppState;
use counsel_backend::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().await?;
    logging::init(&state.paths);

    let bind_addr = match env::var("PORT").ok().and_then(|v| v.parse::<u16>().ok()) {
        Some(port) => format!("127.0.0.1:{port}"),
        None => state.settings.server.bind_addr.clone(),
    };

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {addr}");

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
