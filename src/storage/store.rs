//! SQLite-backed reading store
//!
//! A single connection guarded by a mutex; every query runs on tokio's
//! blocking pool so handlers never stall the runtime.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::{StorageError, StorageResult};
use crate::reading::{parse_timestamp, Reading, TIMESTAMP_FORMAT};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sensor_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        temperature REAL NOT NULL,
        humidity REAL NOT NULL,
        light INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sensor_data_timestamp ON sensor_data (timestamp);
";

/// Persistent store of sensor readings
#[derive(Clone)]
pub struct ReadingStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl ReadingStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("Reading store opened at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file, if not in-memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StorageError::Lock(e.to_string()))?;
            f(&guard)
        })
        .await?
    }

    /// Store a reading and return it as persisted: with its assigned id and
    /// the timestamp truncated to whole seconds
    pub async fn insert(&self, reading: Reading) -> StorageResult<Reading> {
        let reading = Reading {
            timestamp: reading.timestamp.trunc_subsecs(0),
            ..reading
        };
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO sensor_data (timestamp, temperature, humidity, light) VALUES (?1, ?2, ?3, ?4)",
                params![
                    reading.timestamp_string(),
                    reading.temperature,
                    reading.humidity,
                    reading.light,
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(reading.with_id(id))
        })
        .await
    }

    /// The most recent `limit` readings, oldest first
    pub async fn latest(&self, limit: usize) -> StorageResult<Vec<Reading>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut readings = self
            .run(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, temperature, humidity, light
                     FROM sensor_data ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], row_to_parts)?;
                collect_readings(rows)
            })
            .await?;

        readings.reverse();
        Ok(readings)
    }

    /// All readings at or after `cutoff` (or all readings), oldest first
    pub async fn since(&self, cutoff: Option<DateTime<Utc>>) -> StorageResult<Vec<Reading>> {
        let cutoff = cutoff.map(|c| c.format(TIMESTAMP_FORMAT).to_string());
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, temperature, humidity, light
                 FROM sensor_data WHERE ?1 IS NULL OR timestamp >= ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![cutoff], row_to_parts)?;
            collect_readings(rows)
        })
        .await
    }

    /// Number of stored readings
    pub async fn count(&self) -> StorageResult<usize> {
        self.run(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM sensor_data", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }

    /// Cheap liveness query used by health checks
    pub async fn ping(&self) -> bool {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
        .is_ok()
    }
}

type RowParts = (i64, String, f64, f64, u32);

fn row_to_parts(row: &Row<'_>) -> rusqlite::Result<RowParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn collect_readings<I>(rows: I) -> StorageResult<Vec<Reading>>
where
    I: Iterator<Item = rusqlite::Result<RowParts>>,
{
    let mut readings = Vec::new();
    for row in rows {
        let (id, timestamp, temperature, humidity, light) = row?;
        let timestamp = parse_timestamp(&timestamp).ok_or_else(|| {
            StorageError::Corruption(format!("row {} has invalid timestamp '{}'", id, timestamp))
        })?;
        readings.push(Reading {
            id: Some(id),
            temperature,
            humidity,
            light,
            timestamp,
        });
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = ReadingStore::open_in_memory().unwrap();

        let first = store.insert(Reading::new(21.0, 45.0, 50, at(0))).await.unwrap();
        let second = store.insert(Reading::new(22.0, 46.0, 51, at(1))).await.unwrap();

        assert_eq!(first.id, Some(1));
        assert_eq!(second.id, Some(2));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_latest_is_chronological_and_bounded() {
        let store = ReadingStore::open_in_memory().unwrap();
        for i in 0..10 {
            store
                .insert(Reading::new(20.0 + i as f64, 50.0, 40, at(i)))
                .await
                .unwrap();
        }

        let latest = store.latest(3).await.unwrap();
        let temps: Vec<f64> = latest.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![27.0, 28.0, 29.0]);
        assert_eq!(latest[2].timestamp, at(9));
    }

    #[tokio::test]
    async fn test_since_filters_inclusively() {
        let store = ReadingStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.insert(Reading::new(20.0, 50.0, 40, at(i))).await.unwrap();
        }

        assert_eq!(store.since(Some(at(3))).await.unwrap().len(), 2);
        assert_eq!(store.since(None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("iot_data.db");

        {
            let store = ReadingStore::open(&path).unwrap();
            store.insert(Reading::new(23.3, 52.1, 70, at(0))).await.unwrap();
        }

        let store = ReadingStore::open(&path).unwrap();
        let readings = store.latest(50).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].humidity, 52.1);
        assert!(store.ping().await);
    }
}
