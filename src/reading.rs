//! Core data types for sensor readings
//!
//! This module defines the fundamental types shared by every component:
//! - `Reading`: one timestamped sample of temperature, humidity and light
//! - `Metric`: names one of the three scalar series in a reading
//! - Rounding helpers matching the precision readings are displayed with

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the reading store and CSV export
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single sensor sample
///
/// Readings are immutable once produced. `id` is assigned by the reading
/// store and is absent for readings that were never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Store identifier, if persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Temperature in °C, one decimal place
    pub temperature: f64,
    /// Relative humidity in %, one decimal place
    pub humidity: f64,
    /// Light level on a 0-100 scale
    pub light: u32,
    /// When the sample was taken
    #[serde(with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a reading, rounding temperature and humidity to one decimal
    pub fn new(temperature: f64, humidity: f64, light: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            temperature: round1(temperature),
            humidity: round1(humidity),
            light,
            timestamp,
        }
    }

    /// Builder method: set the store identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Scalar value of one metric
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Light => f64::from(self.light),
        }
    }

    /// Timestamp in the store/export layout (`YYYY-MM-DD HH:MM:SS`)
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Short `HH:MM` label used on chart axes
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// One of the three scalar series carried by a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Humidity,
    Light,
}

impl Metric {
    /// Get all metrics for iteration
    pub fn all() -> &'static [Metric] {
        &[Metric::Temperature, Metric::Humidity, Metric::Light]
    }

    /// Display unit
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity | Metric::Light => "%",
        }
    }

    /// Format a value with this metric's display precision
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Metric::Temperature | Metric::Humidity => format!("{:.1}", value),
            Metric::Light => format!("{:.0}", value),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Temperature => write!(f, "temperature"),
            Metric::Humidity => write!(f, "humidity"),
            Metric::Light => write!(f, "light"),
        }
    }
}

/// Fixed-size per-metric storage, indexed by `Metric`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerMetric<T> {
    pub temperature: T,
    pub humidity: T,
    pub light: T,
}

impl<T> PerMetric<T> {
    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Light => &self.light,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
            Metric::Light => &mut self.light,
        }
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parse a timestamp in RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) form
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Serializes as RFC 3339, accepts RFC 3339 or the store layout
mod flexible_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
