//! Synthetic reading source
//!
//! Generates random but plausible readings for demos and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Mutex;

use super::{ReadingSource, SourceError, SourceResult};
use crate::reading::Reading;

/// Configuration for the synthetic generator
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Number of readings returned by `history`
    pub history_len: usize,
    /// Seconds between consecutive history readings
    pub spacing_secs: i64,
    /// Simulated fetch latency in milliseconds
    pub latency_ms: u64,
    /// Probability in [0, 1] that a fetch fails
    pub failure_rate: f64,
    /// Fixed RNG seed for reproducible output
    pub seed: Option<u64>,
    /// Bounds of the generated light level
    pub light: RangeInclusive<u32>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            history_len: 50,
            spacing_secs: 60,
            latency_ms: 100,
            failure_rate: 0.0,
            seed: None,
            light: 30..=80,
        }
    }
}

/// Reading source backed by a random number generator
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: Mutex<StdRng>,
}

impl SyntheticSource {
    pub fn new(mut config: SyntheticConfig) -> Self {
        let (lo, hi) = (*config.light.start(), *config.light.end());
        config.light = lo.min(hi)..=lo.max(hi);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Generate one reading stamped with `timestamp`
    pub fn generate(&self, timestamp: DateTime<Utc>) -> Reading {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        random_reading(&mut *rng, &self.config.light, timestamp)
    }

    /// Generate a chronological history ending one spacing before `now`
    pub fn generate_history(&self, now: DateTime<Utc>) -> Vec<Reading> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let spacing = Duration::seconds(self.config.spacing_secs);

        (1..=self.config.history_len)
            .rev()
            .map(|i| random_reading(&mut *rng, &self.config.light, now - spacing * i as i32))
            .collect()
    }

    async fn simulate_fetch(&self) -> SourceResult<()> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.failure_rate > 0.0 {
            let roll: f64 = {
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                rng.gen()
            };
            if roll < self.config.failure_rate {
                return Err(SourceError::Generator("simulated sensor dropout".to_string()));
            }
        }

        Ok(())
    }
}

fn random_reading<R: Rng>(rng: &mut R, light: &RangeInclusive<u32>, timestamp: DateTime<Utc>) -> Reading {
    Reading::new(
        rng.gen_range(20.0..30.0),
        rng.gen_range(40.0..70.0),
        rng.gen_range(light.clone()),
        timestamp,
    )
}

#[async_trait]
impl ReadingSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn current(&self) -> SourceResult<Reading> {
        self.simulate_fetch().await?;
        Ok(self.generate(Utc::now()))
    }

    async fn history(&self) -> SourceResult<Vec<Reading>> {
        self.simulate_fetch().await?;
        Ok(self.generate_history(Utc::now()))
    }
}
