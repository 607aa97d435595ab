//! The row-normalizer's output (C9): a row padded/reordered to the target
//! schema's width, with the original observed width preserved for the
//! validation tracker's short/long/empty bookkeeping.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub values: Vec<String>,
    pub observed_length: u64,
}

impl NormalizedRow {
    #[must_use]
    pub fn new(values: Vec<String>, observed_length: u64) -> Self {
        Self { values, observed_length }
    }
}
