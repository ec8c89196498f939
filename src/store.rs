//! Daily record persistence
//!
//! One [`DailyRecord`] per calendar day, replaced wholesale on every
//! write (last writer wins). The store never merges records and has no
//! cross-day transactions.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::models::DailyRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, StoreError>;

    /// Records with `from <= date < to`, in date order
    async fn get_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>, StoreError>;

    /// Insert or replace the record for its date
    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError>;
}

/// Volatile store, used by tests and one-off CLI runs
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    records: RwLock<BTreeMap<NaiveDate, DailyRecord>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        InMemoryMetricsStore::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, StoreError> {
        Ok(self.records.read().await.get(&date).cloned())
    }

    async fn get_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>, StoreError> {
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(self
            .records
            .read()
            .await
            .range(from..to)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(record.date, record.clone());
        Ok(())
    }
}

/// SQLite-backed store; one row per day with the record as JSON
///
/// rusqlite is blocking, so every call runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteMetricsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetricsStore {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        // journal_mode reports the resulting mode as a row
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS daily_records (
                date TEXT PRIMARY KEY,
                record TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(SqliteMetricsStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn decode_row(date: &str, record: &str) -> Result<DailyRecord, StoreError> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| StoreError::CorruptKey(date.to_string()))?;
    Ok(serde_json::from_str(record)?)
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyRecord>, StoreError> {
        let key = date.format(DATE_FORMAT).to_string();
        self.with_connection(move |conn| {
            let row: Option<String> = conn
                .query_row(
                    "SELECT record FROM daily_records WHERE date = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            row.map(|record| decode_row(&key, &record)).transpose()
        })
        .await
    }

    async fn get_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRecord>, StoreError> {
        let from = from.format(DATE_FORMAT).to_string();
        let to = to.format(DATE_FORMAT).to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date, record FROM daily_records WHERE date >= ?1 AND date < ?2 ORDER BY date",
            )?;
            let rows = stmt.query_map(params![from, to], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (date, record) = row?;
                records.push(decode_row(&date, &record)?);
            }
            Ok(records)
        })
        .await
    }

    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError> {
        let key = record.date.format(DATE_FORMAT).to_string();
        let json = serde_json::to_string(record)?;
        let updated_at = Utc::now().to_rfc3339();

        self.with_connection(move |conn| {
            conn.execute(
                r#"
                INSERT INTO daily_records (date, record, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(date) DO UPDATE SET
                    record = excluded.record,
                    updated_at = excluded.updated_at
                "#,
                params![key, json, updated_at],
            )?;
            debug!(date = %key, "Stored daily record");
            Ok(())
        })
        .await
    }
}
