//! Data source relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ Request (promise + events) ──▶ RelayHandler
//!                                                                        │
//!                                                                        ▼
//!                                                                  UrlDataSource
//!                                                                        │ outbound HTTP
//!                                                                        ▼
//!     Client Response                                               remote endpoint
//!     ◀────────────── response mapping ◀── request promise ◀── wrapped callback
//! ```
//!
//! Every callback between the handler and the response runs with the
//! originating request restored as the current request.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use datasource_relay::config::loader::load_config;
use datasource_relay::config::RelayConfig;
use datasource_relay::observability::{logging, metrics};
use datasource_relay::{HttpServer, Shutdown};

/// Relay inbound HTTP requests to remote data sources.
#[derive(Debug, Parser)]
#[command(name = "datasource-relay", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "datasource-relay starting");
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        data_sources = config.data_sources.len(),
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::from_config(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
