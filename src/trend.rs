//! Trend Calculator
//!
//! Classifies the movement of a metric between two consecutive readings.

use serde::Serialize;

use crate::reading::{Metric, PerMetric};

/// Minimum absolute change that counts as a trend, uniform across metrics
pub const TREND_THRESHOLD: f64 = 0.5;

/// Movement of a metric between two consecutive readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "direction", content = "delta", rename_all = "lowercase")]
pub enum Trend {
    Up(f64),
    Down(f64),
    Stable,
}

impl Trend {
    /// Label shown next to the metric: `+0.6`, `-1.2` or `Stable`
    pub fn label(&self) -> String {
        match self {
            Trend::Up(delta) => format!("+{:.1}", delta),
            Trend::Down(delta) => format!("{:.1}", delta),
            Trend::Stable => "Stable".to_string(),
        }
    }

    /// Style class for the trend indicator
    pub fn class(&self) -> &'static str {
        match self {
            Trend::Up(_) => "up",
            Trend::Down(_) => "down",
            Trend::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Classify `current` against `previous`.
///
/// Returns `None` when there is no previous value; callers must leave the
/// trend display untouched in that case. A change of exactly
/// `TREND_THRESHOLD` is a trend, not `Stable`.
pub fn classify(current: f64, previous: Option<f64>) -> Option<Trend> {
    let previous = previous?;
    let delta = current - previous;

    let trend = if delta.abs() < TREND_THRESHOLD {
        Trend::Stable
    } else if delta > 0.0 {
        Trend::Up(delta)
    } else {
        Trend::Down(delta)
    };

    Some(trend)
}

/// Per-metric cache of the previously observed value
#[derive(Debug, Clone, Default)]
pub struct TrendTracker {
    previous: PerMetric<Option<f64>>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `current` against the stored value, then remember `current`
    pub fn observe(&mut self, metric: Metric, current: f64) -> Option<Trend> {
        let slot = self.previous.get_mut(metric);
        let trend = classify(current, *slot);
        *slot = Some(current);
        trend
    }

    /// Last value observed for a metric
    pub fn previous(&self, metric: Metric) -> Option<f64> {
        *self.previous.get(metric)
    }

    /// Forget all previous values
    pub fn reset(&mut self) {
        self.previous = PerMetric::default();
    }
}
