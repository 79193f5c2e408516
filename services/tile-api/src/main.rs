//! Radar mosaic tile server.
//!
//! Three cooperating pieces: a poll loop fetching the remote mosaic, a
//! watcher turning new grid files into the published raster, and an HTTP
//! layer serving XYZ tiles from whatever raster is currently published.
//! The service keeps serving the last-known-good raster through any
//! upstream failure.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_api::config::{self, Config};
use tile_api::fetcher::Fetcher;
use tile_api::state::AppState;
use tile_api::{handlers, watcher};

#[derive(Parser, Debug)]
#[command(name = "tile-api")]
#[command(about = "Radar mosaic XYZ tile server")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Directory for grid files and the published raster
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Remote mosaic URL
    #[arg(long, env = "SOURCE_URL", default_value = config::DEFAULT_SOURCE_URL)]
    source_url: String,

    /// Seconds between polls
    #[arg(long, env = "POLL_INTERVAL", default_value = "120")]
    poll_interval_secs: u64,

    /// Raw grid files to retain
    #[arg(long, env = "MAX_GRID_FILES", default_value = "5")]
    max_grid_files: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    info!("Starting radar tile server");

    tokio::fs::create_dir_all(&args.data_dir).await?;

    let config = Config {
        source_url: args.source_url,
        data_dir: args.data_dir,
        poll_interval: Duration::from_secs(args.poll_interval_secs),
        max_grid_files: args.max_grid_files,
        request_timeout: Duration::from_secs(60),
        ..Config::default()
    };

    let fetcher = Arc::new(Fetcher::new(config.clone())?);
    let state = Arc::new(AppState::new(config, fetcher.clone()));

    // Shutdown signal shared by both background tasks.
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let fetch_task = {
        let fetcher = fetcher.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { fetcher.run(shutdown).await })
    };
    let watch_task = tokio::spawn(watcher::run(state.clone(), shutdown_tx.subscribe()));

    let app = handlers::router(state, prometheus_handle);

    let addr: SocketAddr = args.listen.parse()?;
    info!(addr = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
        })
        .await?;

    // Stop the background tasks and wait for their acknowledgment before
    // declaring shutdown complete.
    shutdown_tx.send(()).ok();
    fetch_task.await?;
    watch_task.await?;

    info!("Shutdown complete");
    Ok(())
}
