//! Full-file column profiling results (the Column Profiler's output, C5).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-(file, column) full-pass profile: type distribution, null count,
/// HLL-lite distinct estimate, and numeric/date ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfileResult {
    pub header_name: String,
    pub total_count: u64,
    pub null_count: u64,
    pub unique_estimate: u64,
    pub type_distribution: BTreeMap<String, u64>,
    pub numeric_min: Option<f64>,
    pub numeric_max: Option<f64>,
    pub date_min: Option<String>,
    pub date_max: Option<String>,
}

impl ColumnProfileResult {
    #[must_use]
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            total_count: 0,
            null_count: 0,
            unique_estimate: 0,
            type_distribution: BTreeMap::new(),
            numeric_min: None,
            numeric_max: None,
            date_min: None,
            date_max: None,
        }
    }

    /// Normalized type distribution with the `null`/`empty` buckets merged,
    /// as consumed by the offset resolver's confidence calculation.
    #[must_use]
    pub fn normalized_distribution_merging_null(&self) -> BTreeMap<String, f64> {
        let mut merged: BTreeMap<String, u64> = BTreeMap::new();
        for (bucket, count) in &self.type_distribution {
            let key = if bucket == "null" { "empty" } else { bucket.as_str() };
            *merged.entry(key.to_string()).or_insert(0) += count;
        }
        let total: u64 = merged.values().sum();
        if total == 0 {
            return BTreeMap::new();
        }
        merged
            .into_iter()
            .map(|(k, v)| (k, v as f64 / total as f64))
            .collect()
    }
}
