//! C14 job lifecycle state machine.
//!
//! Grounded on the original `JobStateMachine`
//! (`core/jobs/state_machine.py`): a lock-guarded current state that, on
//! every accepted transition, persists a status upsert and an event append
//! as one unit before the in-memory state is considered committed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use schemaforge_types::{JobEventRecord, JobState, JobStatusRecord, SchemaforgeError};
use uuid::Uuid;

use crate::JobStore;

/// Drives one job's `JobState` through its lifecycle, persisting every
/// accepted transition atomically via [`JobStore::record_transition`]. Owns
/// its store through an `Arc` rather than borrowing it, so a caller (e.g.
/// the CLI) can hold one machine across a multi-step command without fighting
/// a borrow's lifetime.
pub struct JobStateMachine {
    job_id: Uuid,
    state: Mutex<JobState>,
    sequence: AtomicU64,
    store: Arc<dyn JobStore + Send + Sync>,
}

impl JobStateMachine {
    /// Registers the job as `Pending` and persists that initial state.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the initial status/event write
    /// fails.
    pub fn new(job_id: Uuid, store: Arc<dyn JobStore + Send + Sync>) -> Result<Self, SchemaforgeError> {
        let machine = Self { job_id, state: Mutex::new(JobState::Pending), sequence: AtomicU64::new(0), store };
        machine.persist(JobState::Pending, Some("job registered".to_string()))?;
        Ok(machine)
    }

    #[must_use]
    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attempts `current -> target`. A same-state call is a no-op. A
    /// rank-decreasing or post-terminal transition is rejected with
    /// [`SchemaforgeError::IllegalTransition`]; everything else is persisted
    /// as one status-upsert-then-event-append unit under the state lock.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::IllegalTransition`] if the transition is
    /// not allowed, or [`SchemaforgeError::Io`] if the persisted write fails.
    pub fn transition(&self, target: JobState, message: Option<String>) -> Result<(), SchemaforgeError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == target {
            return Ok(());
        }
        if !state.can_transition_to(target) {
            return Err(SchemaforgeError::IllegalTransition { job_id: self.job_id, from: *state, to: target });
        }
        self.record_locked(&mut state, target, message)
    }

    /// Forces the job to `Failed`, bypassing rank checking, exactly like the
    /// original's `mark_failed`.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the persisted write fails.
    pub fn mark_failed(&self, message: Option<String>) -> Result<(), SchemaforgeError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.record_locked(&mut state, JobState::Failed, message)
    }

    /// Forces the job to `Cancelled`, bypassing rank checking, exactly like
    /// the original's `mark_cancelled`.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the persisted write fails.
    pub fn mark_cancelled(&self, message: Option<String>) -> Result<(), SchemaforgeError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.record_locked(&mut state, JobState::Cancelled, message)
    }

    /// Updates the in-memory state and persists the transition while still
    /// holding `state`'s lock, so concurrent callers never interleave writes
    /// for the same job.
    fn record_locked(&self, state: &mut JobState, target: JobState, message: Option<String>) -> Result<(), SchemaforgeError> {
        *state = target;
        self.persist(target, message)
    }

    fn persist(&self, state: JobState, message: Option<String>) -> Result<(), SchemaforgeError> {
        let now = Utc::now();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let status = JobStatusRecord { job_id: self.job_id, state, updated_at: now, message: message.clone() };
        let event = JobEventRecord { job_id: self.job_id, sequence, state, occurred_at: now, message };
        self.store.record_transition(&status, &event)
    }
}
