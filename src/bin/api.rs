//! Sensorboard Sensor API Server
//!
//! Run with: cargo run --bin sensorboard-api
//!
//! Serves simulated sensor readings, persists every reading it hands out
//! and exposes history, statistics and CSV export. This is the upstream the
//! dashboard's live source polls.
//!
//! # Configuration
//!
//! Read from the config file (see `sensorboard-cli config`), with
//! environment overrides:
//! - `SENSORBOARD_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `SENSORBOARD_API_PORT`: Port to listen on (default: 5000)
//! - `SENSORBOARD_DATABASE`: SQLite database path
//! - `SENSORBOARD_CONFIG`: Config file path
//! - `RUST_LOG`: Log filter (overrides the configured level)

use sensorboard::api::{serve, ApiConfig, AppState};
use sensorboard::config::Config;
use sensorboard::source::{SyntheticConfig, SyntheticSource};
use sensorboard::storage::ReadingStore;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("SENSORBOARD_CONFIG").ok().map(PathBuf::from);
    let config = Config::resolve(config_path.as_deref())?;

    config.logging.init();

    tracing::info!("Starting Sensorboard API server v{}", env!("CARGO_PKG_VERSION"));

    let api_config = ApiConfig::from(&config.api);

    tracing::info!("Database: {}", config.api.database);
    let store = ReadingStore::open(&config.api.database)?;
    tracing::info!("Reading store ready ({} readings)", store.count().await?);

    // The server is the sensor: readings are generated here and stamped now.
    let synthetic = &config.source.synthetic;
    let sensor = Arc::new(SyntheticSource::new(SyntheticConfig {
        history_len: config.api.history_limit,
        spacing_secs: synthetic.spacing_secs,
        latency_ms: 0,
        failure_rate: synthetic.failure_rate,
        seed: synthetic.seed,
        light: config.api.light_min..=config.api.light_max,
    }));

    let state = AppState::new(store, sensor, api_config.clone());

    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Sensorboard API server stopped");

    Ok(())
}
