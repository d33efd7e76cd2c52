//! CSV Export
//!
//! Filters readings by a named time range and serializes them to CSV.
//! The resulting text is handed to a [`DownloadSink`], which decides where
//! it ends up (a file on disk for the CLI, an HTTP attachment for the API).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::reading::Reading;

/// Fixed CSV header line
pub const CSV_HEADER: [&str; 5] = [
    "ID",
    "Timestamp",
    "Temperature (°C)",
    "Humidity (%)",
    "Light (%)",
];

/// Named time window used to restrict exported rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportRange {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "all")]
    All,
}

impl ExportRange {
    /// Earliest timestamp kept by this range, or `None` for `all`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ExportRange::Last24Hours => Some(now - Duration::hours(24)),
            ExportRange::Last7Days => Some(now - Duration::days(7)),
            ExportRange::Last30Days => Some(now - Duration::days(30)),
            ExportRange::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportRange::Last24Hours => "24h",
            ExportRange::Last7Days => "7d",
            ExportRange::Last30Days => "30d",
            ExportRange::All => "all",
        }
    }
}

impl std::fmt::Display for ExportRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportRange {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(ExportRange::Last24Hours),
            "7d" => Ok(ExportRange::Last7Days),
            "30d" => Ok(ExportRange::Last30Days),
            "all" => Ok(ExportRange::All),
            other => Err(ExportError::InvalidRange(other.to_string())),
        }
    }
}

/// A reading flattened for export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub light: u32,
}

impl ExportRow {
    /// Flatten a history; readings without a store id are numbered by position (1-based)
    pub fn from_history(history: &[Reading]) -> Vec<ExportRow> {
        history
            .iter()
            .enumerate()
            .map(|(idx, r)| ExportRow {
                id: r.id.unwrap_or(idx as i64 + 1),
                timestamp: r.timestamp,
                temperature: r.temperature,
                humidity: r.humidity,
                light: r.light,
            })
            .collect()
    }

    fn fields(&self) -> [String; 5] {
        [
            self.id.to_string(),
            self.timestamp.format(crate::reading::TIMESTAMP_FORMAT).to_string(),
            format!("{:.1}", self.temperature),
            format!("{:.1}", self.humidity),
            self.light.to_string(),
        ]
    }
}

/// Errors that can occur during export
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid export range '{0}' (expected 24h, 7d, 30d or all)")]
    InvalidRange(String),

    #[error("No data available for range {range}")]
    EmptyResult { range: ExportRange },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Keep rows at or after the range's cutoff; `all` keeps everything
pub fn filter_by_range(rows: &[ExportRow], range: ExportRange, now: DateTime<Utc>) -> Vec<ExportRow> {
    match range.cutoff(now) {
        None => rows.to_vec(),
        Some(cutoff) => rows
            .iter()
            .filter(|row| row.timestamp >= cutoff)
            .cloned()
            .collect(),
    }
}

/// Serialize rows to CSV text: header first, one line per row, `\n`
/// separated, no trailing newline. Fields containing separators are quoted.
pub fn to_csv(rows: &[ExportRow]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record(row.fields())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| ExportError::Serialization(e.to_string()))?;

    if text.ends_with('\n') {
        text.pop();
    }

    Ok(text)
}

/// Filename for an export taken at `now`
pub fn export_filename(range: ExportRange, now: DateTime<Utc>) -> String {
    format!("sensor_data_{}_{}.csv", range, now.format("%Y%m%d_%H%M%S"))
}

/// Receives exported CSV text
pub trait DownloadSink: Send + Sync {
    /// Deliver `text` under `filename`, returning where it ended up
    fn trigger_download(&self, text: &str, filename: &str) -> Result<PathBuf, ExportError>;
}

/// Writes exports into a directory
#[derive(Debug, Clone)]
pub struct FileDownload {
    dir: PathBuf,
}

impl FileDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for FileDownload {
    fn trigger_download(&self, text: &str, filename: &str) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, text)?;
        Ok(path)
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub range: ExportRange,
    pub rows: usize,
    pub filename: String,
    pub location: PathBuf,
}

/// Drives filter → serialize → download
pub struct Exporter<S: DownloadSink> {
    sink: S,
}

impl<S: DownloadSink> Exporter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Export rows within `range`.
    ///
    /// Refuses with [`ExportError::EmptyResult`] before serializing when no
    /// row falls in the range; the sink is not called in that case.
    pub fn export(
        &self,
        rows: &[ExportRow],
        range: ExportRange,
        now: DateTime<Utc>,
    ) -> Result<ExportSummary, ExportError> {
        let filtered = filter_by_range(rows, range, now);
        if filtered.is_empty() {
            tracing::info!(range = %range, "Export refused: no rows in range");
            return Err(ExportError::EmptyResult { range });
        }

        let csv = to_csv(&filtered)?;
        let filename = export_filename(range, now);
        let location = self.sink.trigger_download(&csv, &filename)?;

        tracing::info!(range = %range, rows = filtered.len(), location = ?location, "Export complete");

        Ok(ExportSummary {
            range,
            rows: filtered.len(),
            filename,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn row(id: i64, age: Duration) -> ExportRow {
        ExportRow {
            id,
            timestamp: now() - age,
            temperature: 22.5,
            humidity: 48.1,
            light: 64,
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl DownloadSink for RecordingSink {
        fn trigger_download(&self, text: &str, filename: &str) -> Result<PathBuf, ExportError> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), filename.to_string()));
            Ok(PathBuf::from(filename))
        }
    }

    #[test]
    fn test_range_parsing() {
        assert_eq!("24h".parse::<ExportRange>().unwrap(), ExportRange::Last24Hours);
        assert_eq!("7d".parse::<ExportRange>().unwrap(), ExportRange::Last7Days);
        assert_eq!("30d".parse::<ExportRange>().unwrap(), ExportRange::Last30Days);
        assert_eq!("all".parse::<ExportRange>().unwrap(), ExportRange::All);
        assert!(matches!(
            "1y".parse::<ExportRange>(),
            Err(ExportError::InvalidRange(r)) if r == "1y"
        ));
    }

    #[test]
    fn test_all_is_identity() {
        let rows = vec![row(1, Duration::days(400)), row(2, Duration::zero())];
        assert_eq!(filter_by_range(&rows, ExportRange::All, now()), rows);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let rows = vec![
            row(1, Duration::hours(24) + Duration::seconds(1)),
            row(2, Duration::hours(24)),
            row(3, Duration::minutes(5)),
        ];

        let kept = filter_by_range(&rows, ExportRange::Last24Hours, now());
        let ids: Vec<i64> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_longer_ranges() {
        let rows = vec![
            row(1, Duration::days(31)),
            row(2, Duration::days(8)),
            row(3, Duration::days(2)),
        ];

        assert_eq!(filter_by_range(&rows, ExportRange::Last7Days, now()).len(), 1);
        assert_eq!(filter_by_range(&rows, ExportRange::Last30Days, now()).len(), 2);
    }

    #[test]
    fn test_csv_layout() {
        let rows = vec![row(7, Duration::hours(1)), row(8, Duration::zero())];
        let csv = to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ID,Timestamp,Temperature (°C),Humidity (%),Light (%)");
        assert_eq!(lines[1], "7,2024-06-30 11:00:00,22.5,48.1,64");
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_csv_fields_split_back() {
        let rows = ExportRow::from_history(&[
            Reading::new(19.9, 61.2, 5, now()),
            Reading::new(30.0, 40.0, 100, now()).with_id(42),
        ]);
        let csv = to_csv(&rows).unwrap();

        for (line, row) in csv.lines().skip(1).zip(&rows) {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields, row.fields().iter().map(String::as_str).collect::<Vec<_>>());
        }
        assert!(csv.contains("\n1,"));
        assert!(csv.contains("\n42,"));
    }

    #[test]
    fn test_export_writes_through_sink() {
        let exporter = Exporter::new(RecordingSink::default());
        let rows = vec![row(1, Duration::hours(2))];

        let summary = exporter.export(&rows, ExportRange::Last24Hours, now()).unwrap();

        assert_eq!(summary.rows, 1);
        assert_eq!(summary.filename, "sensor_data_24h_20240630_120000.csv");
        let calls = exporter.sink().calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.starts_with("ID,Timestamp"));
    }

    #[test]
    fn test_empty_export_refused_before_sink() {
        let exporter = Exporter::new(RecordingSink::default());
        let rows = vec![row(1, Duration::days(3))];

        let result = exporter.export(&rows, ExportRange::Last24Hours, now());

        assert!(matches!(
            result,
            Err(ExportError::EmptyResult { range: ExportRange::Last24Hours })
        ));
        assert!(exporter.sink().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_file_download() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(FileDownload::new(dir.path().join("exports")));

        let summary = exporter
            .export(&[row(1, Duration::zero())], ExportRange::All, now())
            .unwrap();

        let written = std::fs::read_to_string(&summary.location).unwrap();
        assert!(written.starts_with("ID,"));
        assert!(written.ends_with("22.5,48.1,64"));
    }
}
