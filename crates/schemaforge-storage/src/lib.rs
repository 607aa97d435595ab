//! Mapping-config and job-lifecycle persistence.
//!
//! [`MappingStore`] has a JSON-file default and an optional `rusqlite`
//! backend behind the `sqlite` feature. [`JobStore`] is SQLite-backed only:
//! job status/event/progress rows are relational by nature and the corpus
//! reaches for an embedded database for exactly this kind of audit trail.

pub mod job_state_machine;
pub mod json_mapping_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_job_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_mapping_store;

pub use job_state_machine::JobStateMachine;
pub use json_mapping_store::JsonMappingStore;
#[cfg(feature = "sqlite")]
pub use sqlite_job_store::SqliteJobStore;
#[cfg(feature = "sqlite")]
pub use sqlite_mapping_store::SqliteMappingStore;

use schemaforge_types::{JobEventRecord, JobMetrics, JobProgressEvent, JobStatusRecord, MappingConfig, SchemaforgeError};

/// Persists and reloads the single `MappingConfig` artifact handed between
/// the clustering, offset-resolution, and materialization phases.
pub trait MappingStore {
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any read/write failure.
    fn save(&self, mapping: &MappingConfig) -> Result<(), SchemaforgeError>;

    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any read failure, including a
    /// missing file.
    fn load(&self) -> Result<MappingConfig, SchemaforgeError>;
}

/// Persists job lifecycle state: status upserts, an append-only event log,
/// and a capped, per-schema progress-event history.
pub trait JobStore {
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any write failure.
    fn upsert_status(&self, status: &JobStatusRecord) -> Result<(), SchemaforgeError>;

    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any write failure.
    fn append_event(&self, event: &JobEventRecord) -> Result<(), SchemaforgeError>;

    /// Records a progress sample and prunes the schema's history down to
    /// `MAX_PROGRESS_EVENTS_PER_SCHEMA` rows, oldest first.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any write failure.
    fn record_progress(&self, event: &JobProgressEvent) -> Result<(), SchemaforgeError>;

    /// Persists an accepted state transition: the status upsert and the
    /// event append happen in that order, on one connection inside one
    /// transaction, so a reader never observes the status row without the
    /// event that explains it (or vice versa).
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any write failure.
    fn record_transition(&self, status: &JobStatusRecord, event: &JobEventRecord) -> Result<(), SchemaforgeError>;

    /// Most recent progress events for a schema, newest first, capped at
    /// `limit`.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any read failure.
    fn fetch_progress(&self, schema_id: uuid::Uuid, limit: usize) -> Result<Vec<JobProgressEvent>, SchemaforgeError>;

    /// Persists one schema's completion summary to `job_metrics`.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any write failure.
    fn record_metrics(&self, metrics: &JobMetrics) -> Result<(), SchemaforgeError>;
}
