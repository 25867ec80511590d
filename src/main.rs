//! Heartwatch monitoring server.
//!
//! Axum server that:
//! - Accepts inbound signal feeds and serves realtime updates over
//!   WebSocket (`/ws?userId=N`)
//! - Serves one-shot risk analysis and per-user alert threshold
//!   configuration over REST (`/api/...`)
//! - Runs the connection heartbeat and the daily aggregation schedule
//!   as background tasks

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use heartwatch::api::{create_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "heartwatch-server", about = "Cardiac monitoring and alerting server")]
struct Args {
    /// HTTP port for REST API and WebSocket feed
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let state = AppState::new();

    let heartbeat = Arc::clone(state.broadcast()).spawn_heartbeat();

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, version = heartwatch::VERSION, "heartwatch server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    heartbeat.abort();
    info!("heartwatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    // Give in-flight sends a moment to flush
    tokio::time::sleep(Duration::from_millis(100)).await;
}
