use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use narrator_core::{Narrator, ServiceConfig};
use narrator_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::default();
    tracing::info!(
        target: "server",
        voices_dir = %config.voices_dir.display(),
        options_path = %config.options_path.display(),
        timeout_ms = ?config.tool_timeout_ms,
        "Starting Narrator"
    );
    let narrator = Arc::new(Narrator::new(config)?);

    let addr: SocketAddr = std::env::var("NARRATOR_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".into())
        .parse()?;

    let app = build_router(AppState { narrator });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "server", addr = %addr, "Narrator server ready");
    axum::serve(listener, app).await?;

    Ok(())
}
