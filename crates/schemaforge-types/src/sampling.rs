//! Types produced by the sampling/profiling stage (line counting, block
//! planning, signature building): [`FileBlock`], [`SchemaSignature`],
//! [`ColumnStats`].

use std::collections::{BTreeMap, HashMap};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// One of the five closed, exhaustive type buckets a cell classifies into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeBucket {
    Empty,
    Integer,
    Float,
    Date,
    Text,
}

impl TypeBucket {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for TypeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-column, per-block profile accumulated by the signature builder.
///
/// `maybe_numeric`/`maybe_date`/`maybe_bool` are sticky: they start `true`
/// and are only ever cleared by a disconfirming sample, never set back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStats {
    pub index: usize,
    pub sample_values: Vec<String>,
    pub sample_count: u64,
    pub type_counts: BTreeMap<String, u64>,
    pub maybe_numeric: bool,
    pub maybe_date: bool,
    pub maybe_bool: bool,
}

impl ColumnStats {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            sample_values: Vec::new(),
            sample_count: 0,
            type_counts: BTreeMap::new(),
            maybe_numeric: true,
            maybe_date: true,
            maybe_bool: true,
        }
    }

    /// Records one observed cell, respecting `sample_cap` for the retained
    /// sample-value set while still counting every observation.
    pub fn observe(&mut self, value: &str, bucket: TypeBucket, sample_cap: usize) {
        self.sample_count += 1;
        *self.type_counts.entry(bucket.as_str().to_string()).or_insert(0) += 1;
        if self.sample_values.len() < sample_cap && !value.is_empty() {
            self.sample_values.push(value.to_string());
        }
        if bucket != TypeBucket::Integer && bucket != TypeBucket::Float && bucket != TypeBucket::Empty {
            self.maybe_numeric = false;
        }
        if bucket != TypeBucket::Date && bucket != TypeBucket::Empty {
            self.maybe_date = false;
        }
        if self.maybe_bool {
            let lowered = value.trim().to_lowercase();
            let is_bool_like = matches!(
                lowered.as_str(),
                "" | "true" | "false" | "0" | "1" | "yes" | "no"
            );
            if !is_bool_like {
                self.maybe_bool = false;
            }
        }
    }

    /// Total observations across all buckets, in canonical bucket order.
    #[must_use]
    pub fn ensure_type_buckets(&self) -> Vec<(String, u64)> {
        crate::ensure_type_buckets(&self.type_counts.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }
}

/// The reserved prefix that threads a block's detected source encoding
/// through `header_sample` when the block is a file's first (`block_id == 0`).
pub const ENCODING_SENTINEL_PREFIX: &str = "ENCODING:";

/// Delimiter + column count + per-column type hints for one sampled block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSignature {
    pub delimiter: char,
    pub column_count: usize,
    pub header_sample: Option<String>,
    pub columns: HashMap<usize, ColumnStats>,
}

impl SchemaSignature {
    /// The encoding sentinel embedded in `header_sample`, if this signature
    /// belongs to a file's first block and encoding detection recorded one.
    #[must_use]
    pub fn encoding_hint(&self) -> Option<&str> {
        self.header_sample
            .as_deref()
            .and_then(|s| s.strip_prefix(ENCODING_SENTINEL_PREFIX))
    }
}

/// A contiguous, bounded line range sampled from a file, with its signature.
///
/// Invariant: `start_line <= end_line < total_lines` and
/// `end_line - start_line + 1 <= configured block_size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBlock {
    pub file_path: Utf8PathBuf,
    pub block_id: usize,
    pub start_line: u64,
    pub end_line: u64,
    pub signature: SchemaSignature,
    /// Assigned by the materialization runner's bootstrap clustering pass,
    /// not at block-creation time.
    pub schema_id: Option<uuid::Uuid>,
}

impl FileBlock {
    #[must_use]
    pub fn is_first_block(&self) -> bool {
        self.block_id == 0 || self.start_line == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_flags_only_ever_clear() {
        let mut stats = ColumnStats::new(0);
        stats.observe("42", TypeBucket::Integer, 8);
        assert!(stats.maybe_numeric);
        stats.observe("hello", TypeBucket::Text, 8);
        assert!(!stats.maybe_numeric);
        stats.observe("7", TypeBucket::Integer, 8);
        assert!(!stats.maybe_numeric, "sticky flag must not re-set to true");
    }

    #[test]
    fn sample_cap_is_respected() {
        let mut stats = ColumnStats::new(0);
        for i in 0..10 {
            stats.observe(&i.to_string(), TypeBucket::Integer, 3);
        }
        assert_eq!(stats.sample_values.len(), 3);
        assert_eq!(stats.sample_count, 10);
    }

    #[test]
    fn encoding_hint_round_trips() {
        let sig = SchemaSignature {
            delimiter: ',',
            column_count: 2,
            header_sample: Some(format!("{ENCODING_SENTINEL_PREFIX}cp1251")),
            columns: HashMap::new(),
        };
        assert_eq!(sig.encoding_hint(), Some("cp1251"));
    }
}
