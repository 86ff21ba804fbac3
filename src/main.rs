//! Route dispatch server.
//!
//! Loads a TOML route configuration, answers every request with the route it
//! would be dispatched to, and hot-reloads the configuration file.
//!
//! ```text
//!     Client Request ──▶ request id ──▶ SharedRouteTable::load
//!                                            │
//!                                            ▼
//!                         host/path candidates ─▶ header rules ─▶ specificity
//!                                                                     │
//!     JSON decision ◀─────────────────────────────────────────────────┘
//!
//!     config file ──▶ ConfigWatcher ──▶ RouteTable::rebuild ──▶ atomic publish
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use route_dispatch::config::{load_config, ConfigWatcher, ProxyConfig};
use route_dispatch::lifecycle::{wait_for_shutdown, Shutdown};
use route_dispatch::observability::{logging, metrics};
use route_dispatch::HttpServer;

#[derive(Parser)]
#[command(name = "route-dispatch", version, about = "Header-aware route dispatch server")]
struct Args {
    /// Route configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-dispatch starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
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

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match (&args.config, args.no_watch) {
        (Some(path), false) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    wait_for_shutdown(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
