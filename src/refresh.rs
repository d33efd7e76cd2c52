//! Refresh Loop
//!
//! Two independent periodic tasks keep the dashboard current:
//! - the current-reading task updates live values and trends
//! - the history task recomputes statistics and chart series
//!
//! Each task awaits its own tick before polling its timer again, so a task
//! never overlaps itself. Ticks that come due while a fetch is still in
//! flight are skipped rather than queued.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::display::{ChartSeries, Display};
use crate::reading::{Metric, PerMetric};
use crate::source::ReadingSource;
use crate::stats::aggregate;
use crate::trend::{Trend, TrendTracker};

/// Intervals for the two refresh tasks
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub current_interval: Duration,
    pub history_interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            current_interval: Duration::from_millis(2000),
            history_interval: Duration::from_millis(10_000),
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Display was updated
    Updated,
    /// Source failed; display marked disconnected, values left as they were
    Disconnected,
    /// Nothing to show this cycle
    Skipped,
}

/// A periodic unit of work
#[async_trait]
pub trait Tick: Send {
    fn name(&self) -> &'static str;

    async fn tick(&mut self) -> TickOutcome;
}

/// Pulls the current reading into live values and trends
pub struct CurrentRefresh {
    source: Arc<dyn ReadingSource>,
    display: Arc<dyn Display>,
    trends: TrendTracker,
}

impl CurrentRefresh {
    pub fn new(source: Arc<dyn ReadingSource>, display: Arc<dyn Display>) -> Self {
        Self {
            source,
            display,
            trends: TrendTracker::new(),
        }
    }

    pub fn trends(&self) -> &TrendTracker {
        &self.trends
    }
}

#[async_trait]
impl Tick for CurrentRefresh {
    fn name(&self) -> &'static str {
        "current"
    }

    async fn tick(&mut self) -> TickOutcome {
        let reading = match self.source.current().await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(source = self.source.name(), error = %e, "Failed to fetch current reading");
                self.display.set_connected(false).await;
                return TickOutcome::Disconnected;
            }
        };

        let mut trends: PerMetric<Option<Trend>> = PerMetric::default();
        for &metric in Metric::all() {
            *trends.get_mut(metric) = self.trends.observe(metric, reading.value(metric));
        }

        self.display.apply_reading(&reading, &trends).await;

        tracing::debug!(
            temperature = reading.temperature,
            humidity = reading.humidity,
            light = reading.light,
            "Current reading applied"
        );
        TickOutcome::Updated
    }
}

/// Pulls history into statistics and chart series
pub struct HistoryRefresh {
    source: Arc<dyn ReadingSource>,
    display: Arc<dyn Display>,
}

impl HistoryRefresh {
    pub fn new(source: Arc<dyn ReadingSource>, display: Arc<dyn Display>) -> Self {
        Self { source, display }
    }
}

#[async_trait]
impl Tick for HistoryRefresh {
    fn name(&self) -> &'static str {
        "history"
    }

    async fn tick(&mut self) -> TickOutcome {
        let history = match self.source.history().await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(source = self.source.name(), error = %e, "Failed to fetch history");
                return TickOutcome::Skipped;
            }
        };

        // An empty history never reaches the aggregator.
        let stats = match aggregate(&history) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping history refresh");
                return TickOutcome::Skipped;
            }
        };

        let labels: Vec<String> = history.iter().map(|r| r.time_label()).collect();
        let temperature = ChartSeries {
            labels: labels.clone(),
            values: history.iter().map(|r| r.temperature).collect(),
        };
        let humidity = ChartSeries {
            labels,
            values: history.iter().map(|r| r.humidity).collect(),
        };

        tracing::debug!(%stats, "History applied");
        self.display.apply_history(temperature, humidity, stats).await;

        TickOutcome::Updated
    }
}

/// A running periodic task that can be cancelled on its own
pub struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Request the task to stop after its current tick
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the task to exit
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("Refresh task ended abnormally: {}", e);
        }
    }
}

/// Shortest period a refresh task runs at
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Spawn `task` to tick immediately and then every `period` until cancelled.
///
/// Periods below [`MIN_PERIOD`] are raised to it.
pub fn spawn_periodic<T>(mut task: T, period: Duration, token: CancellationToken) -> ScheduledTask
where
    T: Tick + 'static,
{
    if period < MIN_PERIOD {
        tracing::warn!(task = task.name(), ?period, "Refresh period too short, using {:?}", MIN_PERIOD);
    }
    let period = period.max(MIN_PERIOD);
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(task = task.name(), period_ms = period.as_millis() as u64, "Refresh task started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = task.tick().await;
                    tracing::trace!(task = task.name(), ?outcome, "Tick finished");
                }
                _ = task_token.cancelled() => {
                    tracing::info!(task = task.name(), "Refresh task stopped");
                    break;
                }
            }
        }
    });

    ScheduledTask { token, handle }
}

/// Both refresh tasks, wired to one source and one display
pub struct RefreshLoop {
    current: CurrentRefresh,
    history: HistoryRefresh,
    config: RefreshConfig,
}

impl RefreshLoop {
    pub fn new(
        source: Arc<dyn ReadingSource>,
        display: Arc<dyn Display>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            current: CurrentRefresh::new(Arc::clone(&source), Arc::clone(&display)),
            history: HistoryRefresh::new(source, display),
            config,
        }
    }

    /// Start both tasks
    pub fn start(self) -> RefreshHandle {
        RefreshHandle {
            current: spawn_periodic(self.current, self.config.current_interval, CancellationToken::new()),
            history: spawn_periodic(self.history, self.config.history_interval, CancellationToken::new()),
        }
    }
}

/// Handles to the two running refresh tasks
pub struct RefreshHandle {
    pub current: ScheduledTask,
    pub history: ScheduledTask,
}

impl RefreshHandle {
    /// Stop both tasks and wait for them to exit
    pub async fn shutdown(self) {
        self.current.stop().await;
        self.history.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DashboardState;
    use crate::reading::Reading;
    use crate::source::{SourceError, SourceResult, SyntheticConfig, SyntheticSource};
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays queued outcomes; fails once the queue is exhausted
    #[derive(Default)]
    struct ScriptedSource {
        current: Mutex<VecDeque<SourceResult<Reading>>>,
        history: Mutex<VecDeque<SourceResult<Vec<Reading>>>>,
    }

    impl ScriptedSource {
        fn push_current(&self, result: SourceResult<Reading>) {
            self.current.lock().unwrap().push_back(result);
        }

        fn push_history(&self, result: SourceResult<Vec<Reading>>) {
            self.history.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl ReadingSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn current(&self) -> SourceResult<Reading> {
            self.current
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Unavailable("script exhausted".into())))
        }

        async fn history(&self) -> SourceResult<Vec<Reading>> {
            self.history
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Unavailable("script exhausted".into())))
        }
    }

    fn reading(t: f64, h: f64, l: u32) -> Reading {
        Reading::new(t, h, l, Utc::now())
    }

    fn setup() -> (Arc<ScriptedSource>, Arc<DashboardState>) {
        (Arc::new(ScriptedSource::default()), Arc::new(DashboardState::new()))
    }

    #[tokio::test]
    async fn test_first_tick_sets_values_without_trends() {
        let (source, display) = setup();
        source.push_current(Ok(reading(22.0, 50.0, 40)));

        let mut current = CurrentRefresh::new(source.clone(), display.clone());
        assert_eq!(current.tick().await, TickOutcome::Updated);

        let snapshot = display.snapshot().await;
        assert!(snapshot.connected);
        assert_eq!(snapshot.values.temperature, Some(22.0));
        assert_eq!(snapshot.values.light, Some(40.0));
        assert_eq!(snapshot.trends.temperature, None);
        assert!(snapshot.last_update.is_some());
    }

    #[tokio::test]
    async fn test_second_tick_sets_trends() {
        let (source, display) = setup();
        source.push_current(Ok(reading(22.0, 50.0, 40)));
        source.push_current(Ok(reading(23.0, 50.2, 30)));

        let mut current = CurrentRefresh::new(source.clone(), display.clone());
        current.tick().await;
        current.tick().await;

        let snapshot = display.snapshot().await;
        assert_eq!(snapshot.trends.temperature, Some(Trend::Up(1.0)));
        assert_eq!(snapshot.trends.humidity, Some(Trend::Stable));
        assert_eq!(snapshot.trends.light, Some(Trend::Down(-10.0)));
        assert_eq!(current.trends().previous(Metric::Temperature), Some(23.0));
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_prior_values() {
        let (source, display) = setup();
        source.push_current(Ok(reading(22.0, 50.0, 40)));
        source.push_current(Err(SourceError::Timeout));
        source.push_current(Ok(reading(25.0, 50.0, 40)));

        let mut current = CurrentRefresh::new(source.clone(), display.clone());
        current.tick().await;
        assert_eq!(current.tick().await, TickOutcome::Disconnected);

        let snapshot = display.snapshot().await;
        assert!(!snapshot.connected);
        assert_eq!(snapshot.values.temperature, Some(22.0));
        assert_eq!(snapshot.current_updates, 1);

        // Trend is computed against the last successful reading.
        assert_eq!(current.tick().await, TickOutcome::Updated);
        let snapshot = display.snapshot().await;
        assert!(snapshot.connected);
        assert_eq!(snapshot.trends.temperature, Some(Trend::Up(3.0)));
    }

    #[tokio::test]
    async fn test_history_tick_updates_charts_and_stats() {
        let (source, display) = setup();
        source.push_history(Ok(vec![reading(20.0, 40.0, 30), reading(22.0, 44.0, 50)]));

        let mut history = HistoryRefresh::new(source.clone(), display.clone());
        assert_eq!(history.tick().await, TickOutcome::Updated);

        let snapshot = display.snapshot().await;
        assert_eq!(snapshot.temperature_chart.values, vec![20.0, 22.0]);
        assert_eq!(snapshot.humidity_chart.values, vec![40.0, 44.0]);
        assert_eq!(snapshot.temperature_chart.labels.len(), 2);
        assert_eq!(snapshot.temperature_chart.labels[0].len(), 5);

        let stats = snapshot.statistics.unwrap();
        assert_eq!(stats.avg_temperature, 21.0);
        assert_eq!(stats.avg_light, 40);
        assert_eq!(stats.sample_count, 2);
    }

    #[tokio::test]
    async fn test_empty_or_failed_history_changes_nothing() {
        let (source, display) = setup();
        source.push_history(Ok(Vec::new()));
        source.push_history(Err(SourceError::Status(500)));

        let mut history = HistoryRefresh::new(source.clone(), display.clone());
        assert_eq!(history.tick().await, TickOutcome::Skipped);
        assert_eq!(history.tick().await, TickOutcome::Skipped);

        let snapshot = display.snapshot().await;
        assert!(snapshot.statistics.is_none());
        assert!(snapshot.temperature_chart.is_empty());
        assert_eq!(snapshot.history_updates, 0);
    }

    #[tokio::test]
    async fn test_loop_runs_and_stops() {
        let source: Arc<dyn ReadingSource> = Arc::new(SyntheticSource::new(SyntheticConfig {
            latency_ms: 0,
            seed: Some(1),
            ..Default::default()
        }));
        let display = Arc::new(DashboardState::new());

        let handle = RefreshLoop::new(
            source,
            display.clone(),
            RefreshConfig {
                current_interval: Duration::from_millis(10),
                history_interval: Duration::from_millis(20),
            },
        )
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;

        handle.current.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.current.is_finished());
        assert!(!handle.history.is_finished());

        handle.shutdown().await;

        let snapshot = display.snapshot().await;
        assert!(snapshot.connected);
        assert!(snapshot.values.temperature.is_some());
        assert_eq!(snapshot.temperature_chart.len(), 50);
        assert_eq!(snapshot.statistics.map(|s| s.sample_count), Some(50));
    }

    /// Answers `current` after a queued delay, tracking concurrent calls
    #[derive(Default)]
    struct PacedSource {
        delays: Mutex<VecDeque<Duration>>,
        default_delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl PacedSource {
        fn with_delay(delay: Duration) -> Self {
            Self {
                default_delay: delay,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReadingSource for PacedSource {
        fn name(&self) -> &str {
            "paced"
        }

        async fn current(&self) -> SourceResult<Reading> {
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or(self.default_delay);
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(reading(22.0, 50.0, 40))
        }

        async fn history(&self) -> SourceResult<Vec<Reading>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_never_overlaps() {
        let source = Arc::new(PacedSource::with_delay(Duration::from_millis(35)));
        let display = Arc::new(DashboardState::new());

        let task = spawn_periodic(
            CurrentRefresh::new(source.clone(), display.clone()),
            Duration::from_millis(10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        let calls = source.calls();
        task.stop().await;

        // One fetch at a time, started no more often than the source answers.
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(calls >= 2);
        assert!(calls <= 400 / 35 + 1, "{} fetches in 400ms", calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ticks_are_not_replayed() {
        let source = Arc::new(PacedSource::default());
        source.delays.lock().unwrap().push_back(Duration::from_millis(100));
        let display = Arc::new(DashboardState::new());

        let task = spawn_periodic(
            CurrentRefresh::new(source.clone(), display.clone()),
            Duration::from_millis(10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let calls = source.calls();
        task.stop().await;

        // The ten ticks missed during the slow first fetch are dropped:
        // roughly one fetch per period afterwards, not a catch-up burst.
        assert!((10..=13).contains(&calls), "{} fetches in 200ms", calls);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    struct CountingTick {
        ticks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tick for CountingTick {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn tick(&mut self) -> TickOutcome {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            TickOutcome::Updated
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let task = spawn_periodic(
            CountingTick { ticks: ticks.clone() },
            Duration::ZERO,
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!task.is_finished());
        assert!(ticks.load(Ordering::SeqCst) >= 2);
        task.stop().await;
    }
}
