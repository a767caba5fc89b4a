//! Control-plane HTTP service.
//!
//! Runs beside the swing-bot scan loop without sharing a process with it.
//! Everything it knows comes from the files the bot maintains: the runtime
//! config, the sanitized status snapshot, and the JSON log files. Reads are
//! open on loopback; mutations require a bearer token and go through the
//! same atomic config store the bot hot-reloads from.

mod auth;
mod config;
mod error;
mod handlers;
mod state;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swing_bot::LogRelay;

use crate::config::ServiceConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let service_config = ServiceConfig::from_env()?;
    info!(
        listen = %service_config.listen_addr,
        data_dir = %service_config.data_dir.display(),
        log_dir = %service_config.log_dir.display(),
        auth = if service_config.auth_token.is_some() { "token" } else { "disabled" },
        "starting control plane"
    );

    // 1. Log relay: tails the bot's JSON log files and fans redacted lines
    //    out to SSE subscribers.
    let relay = LogRelay::new(&service_config.log_dir);
    let log_sender = relay.sender();

    // 2. Shared state: config store, snapshot reader, strategy catalog.
    let state = AppState::new(&service_config, log_sender);
    let app = handlers::router(state);

    let shutdown = CancellationToken::new();
    let relay_handle = tokio::spawn(relay.run(shutdown.clone()));

    // 3. Serve until ctrl-c.
    let listener = TcpListener::bind(service_config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", service_config.listen_addr))?;
    info!(addr = %service_config.listen_addr, "control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("control plane server error")?;

    shutdown.cancel();
    let _ = relay_handle.await;
    info!("control plane stopped");

    Ok(())
}

/// Stderr-only output. This process must never write into the bot's log
/// directory, which the relay is tailing.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("control_plane=info,tower_http=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();
}
