//! Soapbox Telemetry Daemon
//!
//! Background service that samples the ride sensors and serves telemetry,
//! channel health and session statistics as JSON for the dashboard.

mod config;
mod state;
mod web;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use soapbox_sensors::{HardwareProbe, SensorConfig};

use config::Config;
use state::AppState;

#[derive(Parser)]
#[command(name = "soapboxd")]
#[command(about = "Telemetry daemon for the soapbox dashboard")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force simulated sensors even when hardware is present
    #[arg(long)]
    demo: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let directive = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path).context("Failed to load configuration")?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => Config::default(),
    };

    // The data source is decided once, at startup
    let probe = if cli.demo {
        info!("Demo mode forced via command line");
        HardwareProbe::none()
    } else {
        HardwareProbe::detect()
    };

    let sensor_config = SensorConfig {
        hall_pin: config.sensors.hall_pin,
        wheel_circumference_m: config.sensors.wheel_circumference_m,
        sea_level_hpa: config.sensors.sea_level_hpa,
        statistics_path: PathBuf::from(&config.sensors.statistics_file),
    };

    // Initialize application state
    let state = Arc::new(AppState::new(probe, sensor_config));

    // Start poll loop
    let poll_state = state.clone();
    let poll_interval = config.poll_interval_ms;
    tokio::spawn(async move {
        poll_loop(poll_state, poll_interval).await;
    });

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    // Optionally serve the JSON API
    if config.web.enable {
        let app = web::create_router(state.clone());
        let addr: SocketAddr = config
            .web
            .listen
            .parse()
            .context("Invalid listen address")?;
        let listener = TcpListener::bind(addr).await?;
        info!("API listening on http://{}", addr);

        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    } else {
        info!("Web API disabled");
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    }

    state.cleanup();
    Ok(())
}

/// Samples the sensors at the dashboard cadence.
async fn poll_loop(state: Arc<AppState>, interval_ms: u64) {
    let interval = std::time::Duration::from_millis(interval_ms);
    loop {
        state.poll();
        tokio::time::sleep(interval).await;
    }
}
