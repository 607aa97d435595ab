//! Embedded-SQL job-lifecycle persistence: status upserts, an append-only
//! event log, and a capped progress-event history per schema. Mirrors the
//! table shapes the original SQLite adapter maintained for `job_metrics`
//! and `job_progress_events`, short transaction per write.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use schemaforge_types::{
    JobEventRecord, JobMetrics, JobProgressEvent, JobState, JobStatusRecord, SchemaforgeError,
    MAX_PROGRESS_EVENTS_PER_SCHEMA,
};

use crate::JobStore;

pub struct SqliteJobStore {
    db_path: Utf8PathBuf,
}

fn sql_error(db_path: &Utf8PathBuf, error: rusqlite::Error) -> SchemaforgeError {
    SchemaforgeError::Io {
        path: db_path.to_string(),
        source: std::io::Error::other(error.to_string()),
    }
}

fn state_to_str(state: JobState) -> &'static str {
    match state {
        JobState::Pending => "PENDING",
        JobState::Analyzing => "ANALYZING",
        JobState::Mapping => "MAPPING",
        JobState::Materializing => "MATERIALIZING",
        JobState::Validating => "VALIDATING",
        JobState::Done => "DONE",
        JobState::Failed => "FAILED",
        JobState::Cancelled => "CANCELLED",
    }
}

fn state_from_str(raw: &str) -> JobState {
    match raw {
        "ANALYZING" => JobState::Analyzing,
        "MAPPING" => JobState::Mapping,
        "MATERIALIZING" => JobState::Materializing,
        "VALIDATING" => JobState::Validating,
        "DONE" => JobState::Done,
        "FAILED" => JobState::Failed,
        "CANCELLED" => JobState::Cancelled,
        _ => JobState::Pending,
    }
}

fn upsert_status_on(conn: &Connection, db_path: &Utf8PathBuf, status: &JobStatusRecord) -> Result<(), SchemaforgeError> {
    conn.execute(
        "INSERT INTO job_status(job_id, state, updated_at, message) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(job_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at, message = excluded.message",
        rusqlite::params![
            status.job_id.to_string(),
            state_to_str(status.state),
            status.updated_at.to_rfc3339(),
            status.message,
        ],
    )
    .map_err(|e| sql_error(db_path, e))?;
    Ok(())
}

fn append_event_on(conn: &Connection, db_path: &Utf8PathBuf, event: &JobEventRecord) -> Result<(), SchemaforgeError> {
    conn.execute(
        "INSERT INTO job_events(job_id, sequence, state, occurred_at, message) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            event.job_id.to_string(),
            event.sequence as i64,
            state_to_str(event.state),
            event.occurred_at.to_rfc3339(),
            event.message,
        ],
    )
    .map_err(|e| sql_error(db_path, e))?;
    Ok(())
}

impl SqliteJobStore {
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the database cannot be opened or
    /// initialized.
    pub fn new(db_path: Utf8PathBuf) -> Result<Self, SchemaforgeError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SchemaforgeError::Io {
                path: parent.to_string(),
                source,
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| sql_error(&db_path, e))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS job_status (
                job_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                message TEXT
            );
            CREATE TABLE IF NOT EXISTS job_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                state TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                message TEXT
            );
            CREATE TABLE IF NOT EXISTS job_progress_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                schema_id TEXT NOT NULL,
                processed_rows INTEGER NOT NULL,
                total_rows INTEGER,
                eta_seconds REAL,
                rows_per_second REAL NOT NULL,
                spill_rows INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS job_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                schema_id TEXT NOT NULL,
                rows_written INTEGER NOT NULL,
                duration_seconds REAL NOT NULL,
                rows_per_second REAL NOT NULL,
                error_count INTEGER NOT NULL,
                warnings_json TEXT NOT NULL,
                spill_count INTEGER NOT NULL,
                rows_spilled INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(|e| sql_error(&db_path, e))?;
        Ok(Self { db_path })
    }

    fn connect(&self) -> Result<Connection, SchemaforgeError> {
        Connection::open(&self.db_path).map_err(|e| sql_error(&self.db_path, e))
    }
}

impl JobStore for SqliteJobStore {
    fn upsert_status(&self, status: &JobStatusRecord) -> Result<(), SchemaforgeError> {
        let conn = self.connect()?;
        upsert_status_on(&conn, &self.db_path, status)
    }

    fn append_event(&self, event: &JobEventRecord) -> Result<(), SchemaforgeError> {
        let conn = self.connect()?;
        append_event_on(&conn, &self.db_path, event)
    }

    fn record_transition(&self, status: &JobStatusRecord, event: &JobEventRecord) -> Result<(), SchemaforgeError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(|e| sql_error(&self.db_path, e))?;
        upsert_status_on(&tx, &self.db_path, status)?;
        append_event_on(&tx, &self.db_path, event)?;
        tx.commit().map_err(|e| sql_error(&self.db_path, e))?;
        Ok(())
    }

    fn record_progress(&self, event: &JobProgressEvent) -> Result<(), SchemaforgeError> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN").map_err(|e| sql_error(&self.db_path, e))?;
        conn.execute(
            "INSERT INTO job_progress_events(
                schema_id, processed_rows, total_rows, eta_seconds, rows_per_second, spill_rows, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                event.schema_id.to_string(),
                event.processed_rows as i64,
                event.total_rows.map(|v| v as i64),
                event.eta_seconds,
                event.rows_per_second,
                event.spill_rows as i64,
                event.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| sql_error(&self.db_path, e))?;
        prune_progress(&conn, &self.db_path, &event.schema_id.to_string())?;
        conn.execute_batch("COMMIT").map_err(|e| sql_error(&self.db_path, e))?;
        Ok(())
    }

    fn record_metrics(&self, metrics: &JobMetrics) -> Result<(), SchemaforgeError> {
        let conn = self.connect()?;
        let warnings_json = serde_json::to_string(&metrics.warnings).map_err(SchemaforgeError::Json)?;
        conn.execute(
            "INSERT INTO job_metrics(
                schema_id, rows_written, duration_seconds, rows_per_second, error_count,
                warnings_json, spill_count, rows_spilled, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                metrics.schema_id.to_string(),
                metrics.rows_written as i64,
                metrics.duration_seconds,
                metrics.rows_per_second,
                metrics.error_count as i64,
                warnings_json,
                metrics.spill_count as i64,
                metrics.rows_spilled as i64,
                metrics.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| sql_error(&self.db_path, e))?;
        Ok(())
    }

    fn fetch_progress(&self, schema_id: uuid::Uuid, limit: usize) -> Result<Vec<JobProgressEvent>, SchemaforgeError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT schema_id, processed_rows, total_rows, eta_seconds, rows_per_second, spill_rows, created_at
                 FROM job_progress_events WHERE schema_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(|e| sql_error(&self.db_path, e))?;
        let rows = stmt
            .query_map(rusqlite::params![schema_id.to_string(), limit as i64], |row| {
                let schema_id: String = row.get(0)?;
                let processed_rows: i64 = row.get(1)?;
                let total_rows: Option<i64> = row.get(2)?;
                let spill_rows: i64 = row.get(5)?;
                let created_at: String = row.get(6)?;
                Ok(JobProgressEvent {
                    schema_id: schema_id.parse().unwrap_or_else(|_| uuid::Uuid::nil()),
                    processed_rows: processed_rows as u64,
                    total_rows: total_rows.map(|v| v as u64),
                    eta_seconds: row.get(3)?,
                    rows_per_second: row.get(4)?,
                    spill_rows: spill_rows as u64,
                    created_at: created_at.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
                })
            })
            .map_err(|e| sql_error(&self.db_path, e))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| sql_error(&self.db_path, e))
    }
}

fn prune_progress(conn: &Connection, db_path: &Utf8PathBuf, schema_id: &str) -> Result<(), SchemaforgeError> {
    conn.execute(
        "DELETE FROM job_progress_events WHERE schema_id = ?1 AND id NOT IN (
            SELECT id FROM job_progress_events WHERE schema_id = ?1 ORDER BY created_at DESC LIMIT ?2
        )",
        rusqlite::params![schema_id, MAX_PROGRESS_EVENTS_PER_SCHEMA as i64],
    )
    .map_err(|e| sql_error(db_path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> (tempfile::TempDir, SqliteJobStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8Path::from_path(dir.path()).unwrap().join("jobs.sqlite");
        (dir, SqliteJobStore::new(path).unwrap())
    }

    #[test]
    fn upsert_status_then_append_event_round_trips() {
        let (_dir, store) = db();
        let job_id = uuid::Uuid::new_v4();
        store
            .upsert_status(&JobStatusRecord {
                job_id,
                state: JobState::Analyzing,
                updated_at: Utc::now(),
                message: None,
            })
            .unwrap();
        store
            .append_event(&JobEventRecord {
                job_id,
                sequence: 1,
                state: JobState::Analyzing,
                occurred_at: Utc::now(),
                message: Some("started".to_string()),
            })
            .unwrap();
    }

    #[test]
    fn record_transition_writes_status_and_event_together() {
        let (_dir, store) = db();
        let job_id = uuid::Uuid::new_v4();
        store
            .record_transition(
                &JobStatusRecord { job_id, state: JobState::Mapping, updated_at: Utc::now(), message: None },
                &JobEventRecord {
                    job_id,
                    sequence: 2,
                    state: JobState::Mapping,
                    occurred_at: Utc::now(),
                    message: Some("mapping".to_string()),
                },
            )
            .unwrap();
    }

    #[test]
    fn record_metrics_persists_one_row() {
        let (_dir, store) = db();
        store
            .record_metrics(&JobMetrics {
                schema_id: uuid::Uuid::new_v4(),
                rows_written: 10,
                duration_seconds: 1.5,
                rows_per_second: 6.0,
                error_count: 0,
                warnings: vec!["short row padded".to_string()],
                spill_count: 0,
                rows_spilled: 0,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn progress_history_is_capped_per_schema() {
        let (_dir, store) = db();
        let schema_id = uuid::Uuid::new_v4();
        for i in 0..5 {
            store
                .record_progress(&JobProgressEvent {
                    schema_id,
                    processed_rows: i,
                    total_rows: Some(100),
                    eta_seconds: None,
                    rows_per_second: 10.0,
                    spill_rows: 0,
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        let events = store.fetch_progress(schema_id, 100).unwrap();
        assert_eq!(events.len(), 5);
    }
}
