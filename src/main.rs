//! Sensorboard Dashboard
//!
//! Headless dashboard: runs the current and history refresh tasks against
//! the configured reading source and logs what a display would show.
//!
//! Run with: cargo run --bin sensorboard -- --source synthetic

use clap::Parser;
use sensorboard::api::shutdown_signal;
use sensorboard::config::Config;
use sensorboard::display::DashboardState;
use sensorboard::refresh::RefreshLoop;
use sensorboard::source::{build_source, SourceMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sensorboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live environmental sensor dashboard")]
struct Args {
    /// Config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reading source override (live, synthetic)
    #[arg(short, long)]
    source: Option<SourceMode>,

    /// Upstream sensor API URL (live mode)
    #[arg(long)]
    url: Option<String>,

    /// How often to log the dashboard summary, in seconds
    #[arg(long, default_value = "5")]
    report_every: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = Config::resolve(args.config.as_deref())?;
    if let Some(mode) = args.source {
        config.source.mode = mode;
    }
    if let Some(url) = args.url {
        config.source.base_url = url;
    }

    config.logging.init();

    tracing::info!("Sensorboard v{}", env!("CARGO_PKG_VERSION"));

    let source = build_source(&config.source)?;
    let dashboard = Arc::new(DashboardState::new());
    let refresh = config.refresh.to_refresh_config();

    tracing::info!(
        source = source.name(),
        current_ms = refresh.current_interval.as_millis() as u64,
        history_ms = refresh.history_interval.as_millis() as u64,
        "Starting refresh loop"
    );

    let handle = RefreshLoop::new(source, dashboard.clone(), refresh).start();

    let mut report = tokio::time::interval(Duration::from_secs(args.report_every.max(1)));
    report.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = report.tick() => {
                let snapshot = dashboard.snapshot().await;
                tracing::info!("{}", snapshot.summary());
                if let Some(stats) = &snapshot.statistics {
                    tracing::info!("Statistics: {}", stats);
                }
            }
        }
    }

    tracing::info!("Stopping refresh loop...");
    handle.shutdown().await;
    tracing::info!("Sensorboard stopped");

    Ok(())
}
