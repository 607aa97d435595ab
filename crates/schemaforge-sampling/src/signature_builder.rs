//! C4: delimiter detection, per-column stat accumulation, and column-count
//! voting from a block's line buffer.

use std::collections::HashMap;

use schemaforge_types::{ColumnStats, SchemaSignature};

use crate::type_classifier::classify_value;

/// Delimiters considered during detection, in the original implementation's
/// priority order (first line's max-count character wins).
const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

const MAX_SIGNATURE_SAMPLE_LINES: usize = 100;

/// Picks the delimiter with the highest occurrence count on `first_line`,
/// defaulting to `,` for an empty line.
#[must_use]
pub fn detect_delimiter(first_line: &str) -> char {
    if first_line.is_empty() {
        return ',';
    }
    DELIMITER_CANDIDATES
        .into_iter()
        .max_by_key(|c| first_line.matches(*c).count())
        .unwrap_or(',')
}

/// Strips a single layer of surrounding quotes after trimming whitespace.
fn normalize_value(value: &str) -> String {
    value.trim().trim_matches('"').trim_matches('\'').to_string()
}

/// Builds a [`SchemaSignature`] from a block's raw line buffer.
///
/// `encoding` is recorded via the reserved `header_sample` sentinel so a
/// first block carries the encoding it was decoded with.
#[must_use]
pub fn build_signature(block_lines: &[String], sample_cap: usize, encoding: &str) -> SchemaSignature {
    if block_lines.is_empty() {
        return SchemaSignature {
            delimiter: ',',
            column_count: 0,
            header_sample: None,
            columns: HashMap::new(),
        };
    }

    let first_line = block_lines[0].trim_end_matches(['\n', '\r']);
    let delimiter = detect_delimiter(first_line);
    let header_sample = if first_line.is_empty() {
        None
    } else {
        Some(format!("{}{encoding}", schemaforge_types::sampling::ENCODING_SENTINEL_PREFIX))
    };

    let mut columns: HashMap<usize, ColumnStats> = HashMap::new();
    let mut column_count_votes: HashMap<usize, u64> = HashMap::new();

    for raw_line in block_lines.iter().take(MAX_SIGNATURE_SAMPLE_LINES) {
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let parts: Vec<&str> = line.split(delimiter).collect();
        *column_count_votes.entry(parts.len()).or_insert(0) += 1;
        for (idx, raw_value) in parts.iter().enumerate() {
            let cleaned = normalize_value(raw_value);
            let bucket = classify_value(&cleaned);
            let stats = columns.entry(idx).or_insert_with(|| ColumnStats::new(idx));
            stats.observe(&cleaned, bucket, sample_cap);
        }
    }

    let column_count = column_count_votes
        .into_iter()
        .max_by_key(|(_, votes)| *votes)
        .map(|(count, _)| count)
        .unwrap_or(0);

    SchemaSignature {
        delimiter,
        column_count,
        header_sample,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_the_majority_delimiter() {
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
    }

    #[test]
    fn empty_first_line_defaults_to_comma() {
        assert_eq!(detect_delimiter(""), ',');
    }

    #[test]
    fn column_count_is_the_modal_row_width() {
        let lines = vec![
            "a,b,c".to_string(),
            "1,2,3".to_string(),
            "4,5".to_string(),
        ];
        let sig = build_signature(&lines, 8, "utf-8");
        assert_eq!(sig.column_count, 3);
    }

    #[test]
    fn empty_block_yields_empty_signature() {
        let sig = build_signature(&[], 8, "utf-8");
        assert_eq!(sig.column_count, 0);
        assert!(sig.columns.is_empty());
    }
}
