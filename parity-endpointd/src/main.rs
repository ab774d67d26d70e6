mod api;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use parity_discovery::{hash, EndpointSet, ServiceConfig};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "parity-endpointd", about = "Discover and inspect Parity backend endpoints")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "parity-endpoints.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve endpoints (from cache if present) and print them
    Resolve,
    /// Discard cached endpoints and discover again
    Refresh,
    /// Point every service at one known address without probing
    Override { address: String },
    /// Probe every resolved endpoint
    Status,
    /// Print detection signals and discovery state
    Info,
    /// Serve the resolved endpoints over HTTP until ctrl-c
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("parity_endpointd=info,parity_discovery=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let service = ServiceConfig::open(&config.settings)?;
    tracing::info!("Endpoint cache at {:?}", config.settings.cache.db_path);

    let result = match cli.command {
        Command::Resolve => print_json(&service.all_endpoints().await),
        Command::Refresh => print_json(&service.refresh().await),
        Command::Override { address } => print_json(&service.override_known_good(&address).await),
        Command::Status => print_json(&service.service_status().await),
        Command::Info => {
            service.all_endpoints().await;
            print_json(&service.network_info())
        }
        Command::Serve => serve(service.clone(), &config).await,
    };

    service.shutdown().await;
    result
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

async fn serve(service: ServiceConfig, config: &Config) -> Result<()> {
    let endpoints = service.all_endpoints().await;
    tracing::info!("Initial endpoint hash: {}", hash::fingerprint(&endpoints));

    let cancel = CancellationToken::new();

    let watch_cancel = cancel.clone();
    let changes = service.subscribe();
    let watch_handle = tokio::spawn(async move {
        log_changes(changes, watch_cancel).await;
    });

    let app_state = api::routes::AppState {
        service,
        config: Arc::new(config.api.clone()),
    };
    let app = api::routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = tokio::join!(watch_handle, server_handle);

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Logs every change to the endpoint set until cancelled.
async fn log_changes(mut rx: watch::Receiver<Option<EndpointSet>>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                match rx.borrow_and_update().as_ref() {
                    Some(endpoints) => tracing::info!(
                        "Endpoints changed (hash {}), backend at {:?}",
                        hash::fingerprint(endpoints),
                        endpoints.get(shared::protocol::PRIMARY_SERVICE)
                    ),
                    None => tracing::info!("Endpoints cleared"),
                }
            }
            _ = cancel.cancelled() => {
                tracing::debug!("Endpoint watcher shutting down");
                break;
            }
        }
    }
}
