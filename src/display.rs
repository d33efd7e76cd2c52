//! Dashboard display
//!
//! The refresh loop pushes values through the [`Display`] trait. The
//! in-memory [`DashboardState`] implementation keeps the latest rendered
//! state so it can be logged, inspected in tests, or served as JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::reading::{Metric, PerMetric, Reading};
use crate::stats::Statistics;
use crate::trend::Trend;

/// Which time-series chart a series belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Temperature,
    Humidity,
}

/// Labels and values for one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sink for everything the dashboard shows
#[async_trait]
pub trait Display: Send + Sync {
    async fn set_connected(&self, connected: bool);

    async fn set_value(&self, metric: Metric, value: f64);

    async fn set_trend(&self, metric: Metric, trend: Trend);

    async fn set_last_update(&self, at: DateTime<Utc>);

    async fn set_chart(&self, chart: ChartKind, series: ChartSeries);

    async fn set_statistics(&self, stats: Statistics);

    /// Show one successful current reading: connected, every value, the
    /// defined trends, then the update instant.
    async fn apply_reading(&self, reading: &Reading, trends: &PerMetric<Option<Trend>>) {
        self.set_connected(true).await;
        for &metric in Metric::all() {
            self.set_value(metric, reading.value(metric)).await;
            if let Some(trend) = *trends.get(metric) {
                self.set_trend(metric, trend).await;
            }
        }
        self.set_last_update(reading.timestamp).await;
    }

    /// Show one successful history snapshot: both charts, then statistics.
    async fn apply_history(&self, temperature: ChartSeries, humidity: ChartSeries, stats: Statistics) {
        self.set_chart(ChartKind::Temperature, temperature).await;
        self.set_chart(ChartKind::Humidity, humidity).await;
        self.set_statistics(stats).await;
    }
}

/// Point-in-time copy of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub connected: bool,
    pub values: PerMetric<Option<f64>>,
    pub trends: PerMetric<Option<Trend>>,
    pub last_update: Option<DateTime<Utc>>,
    pub temperature_chart: ChartSeries,
    pub humidity_chart: ChartSeries,
    pub statistics: Option<Statistics>,
    /// Successful current-reading ticks applied
    pub current_updates: u64,
    /// Successful history ticks applied
    pub history_updates: u64,
}

impl DashboardSnapshot {
    /// One-line summary of the live values, e.g. for log output
    pub fn summary(&self) -> String {
        let parts: Vec<String> = Metric::all()
            .iter()
            .map(|&metric| {
                let value = self
                    .values
                    .get(metric)
                    .map(|v| format!("{}{}", metric.format_value(v), metric.unit()))
                    .unwrap_or_else(|| "-".to_string());
                let trend = self
                    .trends
                    .get(metric)
                    .map(|t| format!(" ({})", t))
                    .unwrap_or_default();
                format!("{}={}{}", metric, value, trend)
            })
            .collect();

        format!(
            "[{}] {}",
            if self.connected { "connected" } else { "disconnected" },
            parts.join(" ")
        )
    }
}

/// In-memory display shared between the refresh tasks and readers
#[derive(Debug, Default)]
pub struct DashboardState {
    inner: RwLock<DashboardSnapshot>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current dashboard
    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.inner.read().await.clone()
    }
}

impl DashboardSnapshot {
    fn mark_connected(&mut self, connected: bool) {
        if self.connected != connected {
            tracing::info!(connected, "Connectivity changed");
        }
        self.connected = connected;
    }

    fn mark_updated(&mut self, at: DateTime<Utc>) {
        self.last_update = Some(at);
        self.current_updates += 1;
    }

    fn put_chart(&mut self, chart: ChartKind, series: ChartSeries) {
        match chart {
            ChartKind::Temperature => self.temperature_chart = series,
            ChartKind::Humidity => self.humidity_chart = series,
        }
    }

    fn put_statistics(&mut self, stats: Statistics) {
        self.statistics = Some(stats);
        self.history_updates += 1;
    }
}

// Batched updates take the write lock once, so a snapshot never shows half a tick.
#[async_trait]
impl Display for DashboardState {
    async fn set_connected(&self, connected: bool) {
        self.inner.write().await.mark_connected(connected);
    }

    async fn set_value(&self, metric: Metric, value: f64) {
        *self.inner.write().await.values.get_mut(metric) = Some(value);
    }

    async fn set_trend(&self, metric: Metric, trend: Trend) {
        *self.inner.write().await.trends.get_mut(metric) = Some(trend);
    }

    async fn set_last_update(&self, at: DateTime<Utc>) {
        self.inner.write().await.mark_updated(at);
    }

    async fn set_chart(&self, chart: ChartKind, series: ChartSeries) {
        self.inner.write().await.put_chart(chart, series);
    }

    async fn set_statistics(&self, stats: Statistics) {
        self.inner.write().await.put_statistics(stats);
    }

    async fn apply_reading(&self, reading: &Reading, trends: &PerMetric<Option<Trend>>) {
        let mut state = self.inner.write().await;
        state.mark_connected(true);
        for &metric in Metric::all() {
            *state.values.get_mut(metric) = Some(reading.value(metric));
            if let Some(trend) = *trends.get(metric) {
                *state.trends.get_mut(metric) = Some(trend);
            }
        }
        state.mark_updated(reading.timestamp);
    }

    async fn apply_history(&self, temperature: ChartSeries, humidity: ChartSeries, stats: Statistics) {
        let mut state = self.inner.write().await;
        state.put_chart(ChartKind::Temperature, temperature);
        state.put_chart(ChartKind::Humidity, humidity);
        state.put_statistics(stats);
    }
}
