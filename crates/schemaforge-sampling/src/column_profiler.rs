//! C5: full-file streaming column profiler, distinct from the bounded-memory
//! sampling pass.

use std::io::BufRead;

use camino::Utf8Path;
use chrono::NaiveDate;
use schemaforge_types::{ColumnProfileResult, SchemaforgeError, TypeBucket};

use crate::hll::HyperLogLogLite;
use crate::type_classifier::classify_value;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];

struct ColumnAccumulator {
    result: ColumnProfileResult,
    distinct: HyperLogLogLite,
}

impl ColumnAccumulator {
    fn new(header: String) -> Self {
        Self {
            result: ColumnProfileResult::new(header),
            distinct: HyperLogLogLite::default(),
        }
    }

    fn observe(&mut self, raw_value: &str) {
        let value = raw_value.trim();
        let bucket = classify_value(value);
        let mapped = map_bucket(bucket);
        *self.result.type_distribution.entry(mapped.to_string()).or_insert(0) += 1;
        self.result.total_count += 1;

        if mapped == "null" {
            self.result.null_count += 1;
            return;
        }
        self.distinct.add(value);

        match bucket {
            TypeBucket::Integer | TypeBucket::Float => {
                if let Some(parsed) = to_float(value) {
                    self.result.numeric_min = Some(self.result.numeric_min.map_or(parsed, |m| m.min(parsed)));
                    self.result.numeric_max = Some(self.result.numeric_max.map_or(parsed, |m| m.max(parsed)));
                }
            }
            TypeBucket::Date => {
                if let Some(iso) = to_iso_date(value) {
                    self.result.date_min = Some(match &self.result.date_min {
                        Some(current) if current.as_str() <= iso.as_str() => current.clone(),
                        _ => iso.clone(),
                    });
                    self.result.date_max = Some(match &self.result.date_max {
                        Some(current) if current.as_str() >= iso.as_str() => current.clone(),
                        _ => iso,
                    });
                }
            }
            TypeBucket::Empty | TypeBucket::Text => {}
        }
    }

    fn finish(mut self) -> ColumnProfileResult {
        self.result.unique_estimate = self.distinct.estimate();
        self.result
    }
}

fn map_bucket(bucket: TypeBucket) -> &'static str {
    if bucket == TypeBucket::Empty {
        "null"
    } else {
        bucket.as_str()
    }
}

fn to_float(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    value.replace(' ', "").replace(',', ".").parse().ok()
}

fn to_iso_date(value: &str) -> Option<String> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(parsed.format("%Y-%m-%d").to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(parsed.format("%Y-%m-%d").to_string());
        }
    }
    None
}

/// Streams `path` delimited by `delimiter`, treating the first non-empty
/// row as the header (blanks filled as `column_k`), and returns one
/// [`ColumnProfileResult`] per column in index order.
///
/// # Errors
/// Returns [`SchemaforgeError::Io`] on open/read failure.
pub fn profile_file_columns(path: &Utf8Path, delimiter: char) -> Result<Vec<ColumnProfileResult>, SchemaforgeError> {
    let file = std::fs::File::open(path).map_err(|source| SchemaforgeError::Io {
        path: path.to_string(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    let mut headers: Vec<String> = Vec::new();
    let mut accumulators: Vec<Option<ColumnAccumulator>> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|source| SchemaforgeError::Io {
            path: path.to_string(),
            source,
        })?;
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(delimiter).collect();

        if headers.is_empty() {
            headers = cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| {
                    let trimmed = cell.trim();
                    if trimmed.is_empty() {
                        format!("column_{}", idx + 1)
                    } else {
                        trimmed.to_string()
                    }
                })
                .collect();
            accumulators = headers.iter().cloned().map(|h| Some(ColumnAccumulator::new(h))).collect();
            continue;
        }

        let width = cells.len().max(headers.len());
        while headers.len() < width {
            headers.push(format!("column_{}", headers.len() + 1));
            accumulators.push(Some(ColumnAccumulator::new(headers.last().unwrap().clone())));
        }
        for idx in 0..width {
            let value = cells.get(idx).copied().unwrap_or("");
            if let Some(acc) = accumulators[idx].as_mut() {
                acc.observe(value);
            }
        }
    }

    Ok(accumulators.into_iter().flatten().map(ColumnAccumulator::finish).collect())
}
