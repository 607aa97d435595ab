//! Header-clustering output types (C7): [`HeaderVariant`] and [`HeaderCluster`].

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// One observed header occurrence at a given (file, column_index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderVariant {
    pub file: Utf8PathBuf,
    pub column_index: usize,
    pub raw_name: String,
    pub normalized_name: String,
    pub detected_types: Vec<String>,
    pub sample_values: Vec<String>,
    pub row_count: u64,
}

/// A set of [`HeaderVariant`]s the clusterizer judged to denote the same
/// canonical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderCluster {
    pub canonical_name: String,
    pub variants: Vec<HeaderVariant>,
    /// Rounded to 2 decimals, clamped to `[0.35, 1.0]`.
    pub confidence: f64,
    pub needs_review: bool,
}

impl HeaderCluster {
    #[must_use]
    pub fn unique_source_count(&self) -> usize {
        let mut files: Vec<&Utf8PathBuf> = self.variants.iter().map(|v| &v.file).collect();
        files.sort();
        files.dedup();
        files.len()
    }
}
