//! Shared data model for the schemaforge pipeline.
//!
//! These types are the contracts passed between the sampling, clustering,
//! offset-resolution, and materialization stages. Nothing here performs I/O;
//! it is pure data plus the small amount of derived logic (`Default`,
//! ordering, bucket math) that every stage needs identically.

pub mod canonical;
pub mod error;
pub mod header;
pub mod job;
pub mod mapping;
pub mod profile;
pub mod row;
pub mod sampling;

pub use canonical::{CanonicalColumnSpec, CanonicalSchema, CanonicalSchemaRegistry};
pub use error::{ErrorCategory, SchemaforgeError};
pub use header::{HeaderCluster, HeaderVariant};
pub use job::{
    JobEventRecord, JobMetrics, JobProgressEvent, JobState, JobStatusRecord, SpillMetrics,
    ValidationSummary,
};
pub use mapping::{DataType, MappingConfig, SchemaColumn, SchemaDefinition, SchemaMappingEntry};
pub use profile::ColumnProfileResult;
pub use row::NormalizedRow;
pub use sampling::{ColumnStats, FileBlock, SchemaSignature, TypeBucket};

/// The type buckets every classifier, profiler, and validator agrees on.
pub const TYPE_BUCKETS: [&str; 5] = ["empty", "integer", "float", "date", "text"];

/// Fills in any missing type buckets with zero counts, in canonical order.
///
/// Grounded on `ensure_type_buckets` in the original Python implementation:
/// downstream consumers (clustering, offset confidence) assume every bucket
/// key is present so they can do L1-distance math without `Option` checks.
#[must_use]
pub fn ensure_type_buckets(counts: &std::collections::HashMap<String, u64>) -> Vec<(String, u64)> {
    TYPE_BUCKETS
        .iter()
        .map(|bucket| (bucket.to_string(), counts.get(*bucket).copied().unwrap_or(0)))
        .collect()
}
