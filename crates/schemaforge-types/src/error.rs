//! The library-wide error type and its CLI exit-code mapping.
//!
//! `SchemaforgeError` is returned by every fallible operation in the
//! pipeline crates. Library code never calls `std::process::exit`; only the
//! root `schemaforge` binary maps an error to a process exit code via
//! [`SchemaforgeError::category`].

use thiserror::Error;

/// The six error kinds spec'd for the pipeline, each with its own retry/fatal
/// policy (enforced by callers, not by this type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal; originates in config loaders; never retried.
    Configuration,
    /// Fatal for the affected file only; the analysis engine marks the task
    /// failed and proceeds with the rest.
    Io,
    /// Non-fatal; contract mismatches are counted, not raised as failures.
    Schema,
    /// Fatal; an illegal job transition, sandbox escape, or dedup violation.
    State,
    /// Raised by reservation; the caller may retry with a smaller request.
    ResourceLimit,
    /// The engine retries the whole task with CP1251 once before failing.
    Encoding,
}

impl ErrorCategory {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Io => 3,
            Self::Schema => 4,
            Self::State => 5,
            Self::ResourceLimit => 6,
            Self::Encoding => 7,
        }
    }
}

/// Library-level error type covering every pipeline stage.
#[derive(Error, Debug)]
pub enum SchemaforgeError {
    #[error("configuration error at {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("schema contract violation in {schema_name}: {reason}")]
    Schema { schema_name: String, reason: String },

    #[error("illegal job transition for {job_id}: {from:?} -> {to:?}")]
    IllegalTransition {
        job_id: uuid::Uuid,
        from: crate::job::JobState,
        to: crate::job::JobState,
    },

    #[error("sandbox escape attempt: {attempted}")]
    SandboxEscape { attempted: String },

    #[error("duplicate row emitted for {file_path}:{line_number}")]
    DedupViolation { file_path: String, line_number: u64 },

    #[error(
        "resource limit exceeded: requested {requested} {resource}, {available} available of {limit} ceiling"
    )]
    ResourceLimit {
        resource: String,
        requested: u64,
        available: u64,
        limit: u64,
    },

    #[error("encoding detection failed for {path} after retry with {attempted_fallback}")]
    Encoding { path: String, attempted_fallback: String },

    #[error("checkpoint corrupt at {path}: {reason}")]
    CheckpointCorrupt { path: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SchemaforgeError {
    /// Maps this error to the category that governs its retry/fatal policy.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::Configuration,
            Self::Io { .. } | Self::CheckpointCorrupt { .. } | Self::Json(_) => ErrorCategory::Io,
            Self::Schema { .. } => ErrorCategory::Schema,
            Self::IllegalTransition { .. } | Self::SandboxEscape { .. } | Self::DedupViolation { .. } => {
                ErrorCategory::State
            }
            Self::ResourceLimit { .. } => ErrorCategory::ResourceLimit,
            Self::Encoding { .. } => ErrorCategory::Encoding,
        }
    }

    #[must_use]
    pub fn to_exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;

    #[test]
    fn illegal_transition_maps_to_state_category() {
        let err = SchemaforgeError::IllegalTransition {
            job_id: uuid::Uuid::nil(),
            from: JobState::Done,
            to: JobState::Analyzing,
        };
        assert_eq!(err.category(), ErrorCategory::State);
        assert_eq!(err.to_exit_code(), 5);
    }
}
