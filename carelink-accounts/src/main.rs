//! carelink-accounts - profile/children/provider/notify passthrough service
//!
//! Stores one JSON document per email and collection, either in the hosted
//! store or in a local SQLite database.

use anyhow::{Context, Result};
use carelink_accounts::store::select_store;
use carelink_accounts::{build_router, AppState, DEFAULT_PORT};
use carelink_common::config::ConfigResolver;
use carelink_common::logging::init_tracing;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

/// Command-line arguments for carelink-accounts
#[derive(Parser, Debug)]
#[command(name = "carelink-accounts")]
#[command(about = "Account document passthrough service for CareLink")]
#[command(version)]
struct Args {
    /// Bootstrap configuration file
    #[arg(short, long, env = "CARELINK_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address; overrides `bind`
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolved = ConfigResolver::new("accounts").with_path(args.config).resolve();
    init_tracing(&resolved.config.logging.level);

    info!(
        "Starting CareLink account passthrough (carelink-accounts) v{}",
        env!("CARGO_PKG_VERSION")
    );
    resolved.log_source();
    let config = resolved.config;

    let store = select_store(&config)
        .await
        .context("Failed to open document store")?;
    match store.ping().await {
        Ok(()) => info!("✓ Document store reachable ({})", store.kind()),
        Err(e) => tracing::warn!("Document store ping failed: {}", e),
    }

    let state = AppState::new(store, &config.hosted);
    let app = build_router(state);

    let addr = args
        .bind
        .unwrap_or_else(|| config.bind_or(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("carelink-accounts listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
