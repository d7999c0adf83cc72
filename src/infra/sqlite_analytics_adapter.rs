use crate::app::ports::{AnalyticsOutcome, AnalyticsSinkPort, ReadingsQueryPort, RowError};
use crate::domain::{ClassifiedEvent, LatestReading};
use crate::error::SinkFault;
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Analytical store backed by a local SQLite table.
///
/// The table must already exist (see [`SqliteAnalyticsStore::provision`]);
/// inserting never creates it. One connection is shared by all in-flight
/// runs; rusqlite connections are not `Sync`, hence the mutex.
pub struct SqliteAnalyticsStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

struct Row {
    sensor_id: String,
    region: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
    vibration: Option<f64>,
    timestamp: String,
    anomaly: bool,
}

impl From<&ClassifiedEvent> for Row {
    fn from(event: &ClassifiedEvent) -> Self {
        Self {
            sensor_id: event.event.sensor_id.clone(),
            region: event.event.region.clone(),
            temperature: event.event.temperature,
            humidity: event.event.humidity,
            vibration: event.event.vibration,
            timestamp: event.event.timestamp.clone(),
            anomaly: event.anomaly,
        }
    }
}

impl SqliteAnalyticsStore {
    pub fn open<P: AsRef<Path>>(path: P, table: &str) -> Result<Self, SinkFault> {
        if !is_sql_identifier(table) {
            return Err(SinkFault::InvalidTable(table.to_string()));
        }
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened analytics store at {}", path.as_ref().display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the readings table and its index if missing.
    pub fn provision(&self) -> Result<(), SinkFault> {
        let conn = lock(&self.conn);
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                capteur_id   TEXT NOT NULL,
                region       TEXT NOT NULL,
                temperature  REAL,
                humidite     REAL,
                vibration    REAL,
                timestamp    TEXT NOT NULL,
                anomalie     INTEGER NOT NULL CHECK (anomalie IN (0, 1)),
                ingested_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );
            CREATE INDEX IF NOT EXISTS {table}_sensor_ts ON {table} (capteur_id, timestamp);
            "#,
            table = self.table
        ))?;
        info!("Provisioned analytics table {}", self.table);
        Ok(())
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (capteur_id, region, temperature, humidite, vibration, timestamp, anomalie)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            self.table
        )
    }

    fn latest_sql(&self) -> String {
        format!(
            "SELECT capteur_id, region, temperature, anomalie, timestamp
             FROM (
                SELECT *, ROW_NUMBER() OVER (PARTITION BY capteur_id ORDER BY timestamp DESC) AS rn
                FROM {}
             )
             WHERE rn = 1
             ORDER BY capteur_id",
            self.table
        )
    }
}

fn lock(conn: &Mutex<Connection>) -> std::sync::MutexGuard<'_, Connection> {
    // a panic mid-statement leaves the connection itself usable
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Row-level problems become rejections, everything else is a transport fault.
fn outcome_for(error: rusqlite::Error) -> AnalyticsOutcome {
    match rejection_reason(&error) {
        Some(reason) => AnalyticsOutcome::RowRejections(vec![RowError {
            index: 0,
            reason: reason.to_string(),
            message: error.to_string(),
        }]),
        None => AnalyticsOutcome::TransportFault(SinkFault::Sqlite(error)),
    }
}

fn rejection_reason(error: &rusqlite::Error) -> Option<&'static str> {
    match error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => Some("constraint"),
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::TypeMismatch => Some("type_mismatch"),
        rusqlite::Error::ToSqlConversionFailure(_) => Some("invalid_value"),
        _ => None,
    }
}

pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl AnalyticsSinkPort for SqliteAnalyticsStore {
    async fn insert(&self, event: &ClassifiedEvent) -> AnalyticsOutcome {
        let conn = Arc::clone(&self.conn);
        let sql = self.insert_sql();
        let row = Row::from(event);

        let joined = tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                &sql,
                params![
                    row.sensor_id,
                    row.region,
                    row.temperature,
                    row.humidity,
                    row.vibration,
                    row.timestamp,
                    row.anomaly
                ],
            )
        })
        .await;

        match joined {
            Ok(Ok(inserted)) => {
                debug!("Inserted {} row(s) into {}", inserted, self.table);
                AnalyticsOutcome::Accepted
            }
            Ok(Err(e)) => outcome_for(e),
            Err(e) => AnalyticsOutcome::TransportFault(SinkFault::Task(e.to_string())),
        }
    }
}

#[async_trait]
impl ReadingsQueryPort for SqliteAnalyticsStore {
    async fn latest_per_sensor(&self) -> Result<Vec<LatestReading>, SinkFault> {
        let conn = Arc::clone(&self.conn);
        let sql = self.latest_sql();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok(LatestReading {
                    capteur_id: row.get(0)?,
                    region: row.get(1)?,
                    temperature: row.get(2)?,
                    anomalie: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?;
            let readings = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(readings)
        })
        .await
        .map_err(|e| SinkFault::Task(e.to_string()))?
    }
}
