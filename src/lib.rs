//! # Sensorboard
//!
//! Environmental sensor dashboard core: polls (or synthesizes) periodic
//! temperature, humidity and light readings and turns them into live
//! values, trend indicators, chart series, summary statistics and CSV
//! exports.
//!
//! ## Modules
//!
//! - [`source`]: Reading sources (live HTTP, synthetic)
//! - [`trend`]: Trend classification between consecutive readings
//! - [`stats`]: History statistics
//! - [`export`]: Range filtering and CSV export
//! - [`refresh`]: The two periodic refresh tasks
//! - [`display`]: Display trait and in-memory dashboard state
//! - [`storage`]: SQLite reading store
//! - [`api`]: Sensor REST API with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sensorboard::display::DashboardState;
//! use sensorboard::refresh::{RefreshConfig, RefreshLoop};
//! use sensorboard::source::{SyntheticConfig, SyntheticSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(SyntheticSource::new(SyntheticConfig::default()));
//!     let dashboard = Arc::new(DashboardState::new());
//!
//!     let handle = RefreshLoop::new(source, dashboard.clone(), RefreshConfig::default()).start();
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     println!("{}", dashboard.snapshot().await.summary());
//!
//!     handle.shutdown().await;
//! }
//! ```

pub mod api;
pub mod config;
pub mod display;
pub mod export;
pub mod reading;
pub mod refresh;
pub mod source;
pub mod stats;
pub mod storage;
pub mod trend;

// Re-export top-level types for convenience
pub use reading::{Metric, Reading};

pub use source::{
    build_source, HttpSource, HttpSourceConfig, ReadingSource, SourceError, SourceMode,
    SourceResult, SyntheticConfig, SyntheticSource,
};

pub use trend::{classify, Trend, TrendTracker, TREND_THRESHOLD};

pub use stats::{aggregate, Statistics, StatsError};

pub use export::{
    filter_by_range, to_csv, DownloadSink, ExportError, ExportRange, ExportRow, Exporter,
    FileDownload,
};

pub use display::{ChartKind, ChartSeries, DashboardSnapshot, DashboardState, Display};

pub use refresh::{RefreshConfig, RefreshHandle, RefreshLoop, TickOutcome};

pub use storage::{ReadingStore, StorageError, StorageResult};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
