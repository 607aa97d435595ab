//! Job lifecycle and telemetry types (C12–C14): state machine states,
//! status/event records, progress events, validation and spill counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cap on retained [`JobProgressEvent`] rows per schema; older rows
/// are pruned on every insert.
pub const MAX_PROGRESS_EVENTS_PER_SCHEMA: usize = 500;

/// Monotonic job lifecycle states. Rank only increases, except via the two
/// terminal escape states `Failed`/`Cancelled`, which are reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Analyzing,
    Mapping,
    Materializing,
    Validating,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    /// Ordinal rank used to reject backward transitions. `Failed`/`Cancelled`
    /// share the highest rank with `Done` since all three are terminal.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Analyzing => 1,
            Self::Mapping => 2,
            Self::Materializing => 3,
            Self::Validating => 4,
            Self::Done | Self::Failed | Self::Cancelled => 5,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is an accepted transition: forward rank, or an
    /// escape to `Failed`/`Cancelled` from a non-terminal state, or a no-op
    /// repeat of the same state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        if self == next {
            return true;
        }
        next.rank() > self.rank() || matches!(next, Self::Failed | Self::Cancelled)
    }
}

/// An upserted snapshot of a job's current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub job_id: uuid::Uuid,
    pub state: JobState,
    pub updated_at: DateTime<Utc>,
    pub message: Option<String>,
}

/// An immutable, append-only event in a job's history. `sequence` totally
/// orders events within a `job_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEventRecord {
    pub job_id: uuid::Uuid,
    pub sequence: u64,
    pub state: JobState,
    pub occurred_at: DateTime<Utc>,
    pub message: Option<String>,
}

/// A rate-limited progress sample emitted during materialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgressEvent {
    pub schema_id: uuid::Uuid,
    pub processed_rows: u64,
    pub total_rows: Option<u64>,
    pub eta_seconds: Option<f64>,
    pub rows_per_second: f64,
    pub spill_rows: u64,
    pub created_at: DateTime<Utc>,
}

/// Row-shape and canonical-contract violation counters (C12).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_rows: u64,
    pub short_rows: u64,
    pub long_rows: u64,
    pub empty_rows: u64,
    pub missing_required: u64,
    pub type_mismatches: u64,
}

/// Spill-buffer telemetry (C10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpillMetrics {
    pub spills: u64,
    pub rows_spilled: u64,
    pub bytes_spilled: u64,
    pub max_buffer_rows: usize,
}

impl SpillMetrics {
    pub fn record_spill(&mut self, rows: u64, bytes: u64, buffer_len: usize) {
        self.spills += 1;
        self.rows_spilled += rows;
        self.bytes_spilled += bytes;
        self.max_buffer_rows = self.max_buffer_rows.max(buffer_len);
    }
}

/// Per-schema job completion summary persisted to `job_metrics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetrics {
    pub schema_id: uuid::Uuid,
    pub rows_written: u64,
    pub duration_seconds: f64,
    pub rows_per_second: f64,
    pub error_count: u64,
    pub warnings: Vec<String>,
    pub spill_count: u64,
    pub rows_spilled: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_never_decreases_except_via_escape_states() {
        assert!(JobState::Pending.can_transition_to(JobState::Analyzing));
        assert!(!JobState::Materializing.can_transition_to(JobState::Mapping));
        assert!(JobState::Mapping.can_transition_to(JobState::Cancelled));
        assert!(JobState::Analyzing.can_transition_to(JobState::Failed));
    }

    #[test]
    fn same_state_transition_is_a_no_op_not_rejected() {
        assert!(JobState::Validating.can_transition_to(JobState::Validating));
    }

    #[test]
    fn terminal_states_accept_no_transitions() {
        assert!(!JobState::Done.can_transition_to(JobState::Validating));
        assert!(!JobState::Failed.can_transition_to(JobState::Cancelled));
        assert!(JobState::Done.can_transition_to(JobState::Done));
    }
}
