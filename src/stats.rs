//! Statistics Aggregator
//!
//! Reduces a history snapshot to per-metric averages and a sample count.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reading::{round1, Reading};

/// Summary of a history snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Mean temperature, one decimal place
    pub avg_temperature: f64,
    /// Mean humidity, one decimal place
    pub avg_humidity: f64,
    /// Mean light level, rounded to the nearest integer
    pub avg_light: u32,
    /// Number of readings the averages were computed from
    pub sample_count: usize,
}

/// Errors raised while aggregating
#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    #[error("cannot compute statistics of an empty history")]
    EmptyInput,
}

/// Aggregate a history into averages
pub fn aggregate(history: &[Reading]) -> Result<Statistics, StatsError> {
    if history.is_empty() {
        return Err(StatsError::EmptyInput);
    }

    let n = history.len() as f64;
    let (temperature, humidity, light) = history.iter().fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(t, h, l), r| (t + r.temperature, h + r.humidity, l + f64::from(r.light)),
    );

    Ok(Statistics {
        avg_temperature: round1(temperature / n),
        avg_humidity: round1(humidity / n),
        avg_light: (light / n).round() as u32,
        sample_count: history.len(),
    })
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "avg {:.1}°C / {:.1}% / light {}% over {} readings",
            self.avg_temperature, self.avg_humidity, self.avg_light, self.sample_count
        )
    }
}
