//! carelink-search - provider search service
//!
//! Serves the provider directory built from the childcare CSV export.

use anyhow::{Context, Result};
use carelink_common::config::ConfigResolver;
use carelink_common::logging::init_tracing;
use carelink_search::catalog::{CsvSource, ProviderCatalog};
use carelink_search::{build_router, AppState, DEFAULT_PORT};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

const DEFAULT_CSV: &str = "data/childcare_results.csv";

/// Command-line arguments for carelink-search
#[derive(Parser, Debug)]
#[command(name = "carelink-search")]
#[command(about = "Childcare provider search service for CareLink")]
#[command(version)]
struct Args {
    /// Bootstrap configuration file
    #[arg(short, long, env = "CARELINK_CONFIG")]
    config: Option<PathBuf>,

    /// Provider CSV (path or http(s) URL); overrides `[search] csv_source`
    #[arg(long)]
    csv: Option<String>,

    /// Listen address; overrides `bind`
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolved = ConfigResolver::new("search").with_path(args.config).resolve();
    init_tracing(&resolved.config.logging.level);

    info!(
        "Starting CareLink provider search (carelink-search) v{}",
        env!("CARGO_PKG_VERSION")
    );
    resolved.log_source();
    let config = resolved.config;

    let location = args
        .csv
        .or(config.search.csv_source.clone())
        .unwrap_or_else(|| DEFAULT_CSV.to_string());
    let catalog = Arc::new(
        ProviderCatalog::new(CsvSource::parse(&location))
            .context("Failed to initialize provider catalog")?,
    );

    // An unreadable CSV still starts the service with an empty catalog
    catalog.reload().await;

    let state = AppState::new(catalog, config.search.page_size);
    let app = build_router(state);

    let addr = args
        .bind
        .unwrap_or_else(|| config.bind_or(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("carelink-search listening on http://{}", addr);
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
