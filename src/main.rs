//! Selenese hub server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client (legacy Selenese driver)
//!         │  POST /hub/session/:sessionId/selenium/:command {"args": [...]}
//!         ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ http server  │──▶│   routing    │──▶│  api handler │──▶│   session    │
//!     │ (axum+tower) │   │ (resources)  │   │              │   │ command queue│
//!     └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                     │
//!                                          ┌──────────────┐   ┌──────▼───────┐
//!                                          │     wait     │◀──│   commands   │
//!                                          │  (waiters)   │   │  (catalog)   │
//!                                          └──────┬───────┘   └──────┬───────┘
//!                                                 └──────▶ browser ◀─┘
//!
//!     Cross-cutting: config (+ hot reload of waits), observability, lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use selenese_hub::api::{build_router, HubState};
use selenese_hub::browser::MemoryBrowserFactory;
use selenese_hub::config::{load_config, validate_config, ConfigError, ConfigWatcher, HubConfig};
use selenese_hub::http::HttpServer;
use selenese_hub::lifecycle::{wait_for_signal, Shutdown};
use selenese_hub::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "selenese-hub")]
#[command(about = "HTTP hub for legacy Selenese browser commands", long_about = None)]
struct Args {
    /// TOML configuration file. Wait defaults reload when it changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => HubConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability);
    tracing::info!("selenese-hub v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount_prefix = %config.routing.mount_prefix,
        selection = ?config.routing.selection,
        wait_timeout_ms = config.waits.timeout_ms,
        wait_interval_ms = config.waits.interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let browsers = Arc::new(MemoryBrowserFactory::new(config.browser.start_url.clone()));
    let hub = Arc::new(HubState::new(&config, browsers, &shutdown));
    let router = Arc::new(build_router(&hub, &config.routing));

    // Keep the watcher alive for the life of the server.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            hub.watch_waits(updates);
            Some(watcher)
        }
        None => None,
    };

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, router);
    server.run(listener, shutdown.subscribe()).await?;

    hub.sessions.close_all().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
