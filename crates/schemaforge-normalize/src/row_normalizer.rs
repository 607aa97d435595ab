//! C9: the row normalizer. Reorders a source row's cells into the target
//! schema's column positions and pads/widens to cover every observed
//! target index.

use std::collections::{BTreeMap, HashMap, HashSet};

use camino::Utf8Path;
use schemaforge_types::{ColumnProfileResult, DataType, NormalizedRow, SchemaColumn, SchemaMappingEntry};

/// The four coarse buckets used for type-agreement fallback resolution;
/// integer and float are treated as interchangeable.
fn bucket_matches_data_type(bucket: &str, data_type: DataType) -> bool {
    match data_type {
        DataType::Int | DataType::Decimal => bucket == "integer" || bucket == "float",
        DataType::Float => bucket == "float" || bucket == "integer",
        DataType::Date | DataType::Datetime => bucket == "date",
        DataType::String | DataType::Bool | DataType::Json => bucket == "text",
    }
}

fn dominant_bucket(profile: &ColumnProfileResult) -> Option<String> {
    let merged = profile.normalized_distribution_merging_null();
    merged
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(bucket, _)| bucket)
}

/// Resolves each source column of one file to its target position and
/// reshapes rows into [`NormalizedRow`]s of consistent, sufficient width.
pub struct RowNormalizer {
    entries_by_source: BTreeMap<usize, SchemaMappingEntry>,
    schema_columns: Vec<SchemaColumn>,
    max_target: usize,
}

impl RowNormalizer {
    #[must_use]
    pub fn new(file_path: &Utf8Path, mapping_entries: &[SchemaMappingEntry], schema_columns: &[SchemaColumn]) -> Self {
        let entries_by_source: BTreeMap<usize, SchemaMappingEntry> = mapping_entries
            .iter()
            .filter(|entry| entry.file_path == file_path)
            .map(|entry| (entry.source_index, entry.clone()))
            .collect();
        let max_from_entries = entries_by_source.values().filter_map(|e| e.target_index).max();
        let max_from_schema = schema_columns.len().checked_sub(1);
        let max_target = max_from_entries.into_iter().chain(max_from_schema).max().unwrap_or(0);
        Self {
            entries_by_source,
            schema_columns: schema_columns.to_vec(),
            max_target,
        }
    }

    fn resolve_target(&self, entry: &SchemaMappingEntry, source_index: usize, profiles: &HashMap<usize, ColumnProfileResult>) -> Option<usize> {
        if let Some(target) = entry.target_index {
            return Some(target);
        }
        if let Some(column) = self.schema_columns.iter().find(|c| c.normalized == entry.canonical_name) {
            return Some(column.index);
        }
        let profile = profiles.get(&source_index)?;
        let bucket = dominant_bucket(profile)?;
        self.schema_columns
            .iter()
            .find(|column| bucket_matches_data_type(&bucket, column.data_type))
            .map(|column| column.index)
    }

    /// Normalizes one source row: width = `max(row.len(), max_target + 1)`.
    #[must_use]
    pub fn normalize(&self, row: &[String], profiles: &HashMap<usize, ColumnProfileResult>) -> NormalizedRow {
        let observed_length = row.len();
        let width = observed_length.max(self.max_target + 1);
        let mut output = vec![String::new(); width];
        let mut assigned = vec![false; width];
        let mut used_sources: HashSet<usize> = HashSet::new();

        for (source_index, entry) in &self.entries_by_source {
            if *source_index >= observed_length {
                continue;
            }
            if let Some(target_index) = self.resolve_target(entry, *source_index, profiles) {
                if target_index < width && !assigned[target_index] {
                    output[target_index] = row[*source_index].clone();
                    assigned[target_index] = true;
                    used_sources.insert(*source_index);
                }
            }
        }

        let mut remaining_sources = (0..observed_length).filter(|idx| !used_sources.contains(idx));
        for (slot, is_assigned) in assigned.iter().enumerate() {
            if *is_assigned {
                continue;
            }
            if let Some(source_index) = remaining_sources.next() {
                output[slot] = row[source_index].clone();
            }
        }

        NormalizedRow::new(output, observed_length as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn schema_columns() -> Vec<SchemaColumn> {
        vec![
            SchemaColumn { index: 0, raw: "city".to_string(), normalized: "city".to_string(), data_type: DataType::String, known_variants: vec![] },
            SchemaColumn { index: 1, raw: "age".to_string(), normalized: "age".to_string(), data_type: DataType::Int, known_variants: vec![] },
        ]
    }

    fn mapping_entry(file: &str, source: usize, canonical: &str, target: usize, offset: Option<i64>) -> SchemaMappingEntry {
        SchemaMappingEntry {
            file_path: Utf8PathBuf::from(file),
            source_index: source,
            canonical_name: canonical.to_string(),
            target_index: Some(target),
            offset_from_index: offset,
            offset_reason: if offset.is_some() { "auto-detected".to_string() } else { String::new() },
            offset_confidence: None,
        }
    }

    #[test]
    fn swapped_columns_are_reordered_to_target() {
        let entries = vec![
            mapping_entry("b.csv", 0, "age", 1, Some(-1)),
            mapping_entry("b.csv", 1, "city", 0, Some(1)),
        ];
        let normalizer = RowNormalizer::new(Utf8Path::new("b.csv"), &entries, &schema_columns());
        let row = vec!["30".to_string(), "Kyiv".to_string()];
        let normalized = normalizer.normalize(&row, &HashMap::new());
        assert_eq!(normalized.values, vec!["Kyiv".to_string(), "30".to_string()]);
    }

    #[test]
    fn stable_file_passes_through_unchanged() {
        let entries = vec![
            mapping_entry("a.csv", 0, "city", 0, None),
            mapping_entry("a.csv", 1, "age", 1, None),
        ];
        let normalizer = RowNormalizer::new(Utf8Path::new("a.csv"), &entries, &schema_columns());
        let row = vec!["Lviv".to_string(), "25".to_string()];
        let normalized = normalizer.normalize(&row, &HashMap::new());
        assert_eq!(normalized.values, row);
        assert_eq!(normalized.observed_length, 2);
    }

    #[test]
    fn extra_source_cells_fill_unassigned_targets_in_order() {
        let entries = vec![mapping_entry("c.csv", 0, "city", 0, None)];
        let normalizer = RowNormalizer::new(Utf8Path::new("c.csv"), &entries, &schema_columns());
        let row = vec!["Kyiv".to_string(), "31".to_string()];
        let normalized = normalizer.normalize(&row, &HashMap::new());
        assert_eq!(normalized.values, vec!["Kyiv".to_string(), "31".to_string()]);
    }

    #[test]
    fn short_row_widens_to_cover_max_target() {
        let entries = vec![mapping_entry("d.csv", 0, "city", 0, None)];
        let normalizer = RowNormalizer::new(Utf8Path::new("d.csv"), &entries, &schema_columns());
        let row = vec!["Kyiv".to_string()];
        let normalized = normalizer.normalize(&row, &HashMap::new());
        assert_eq!(normalized.values.len(), 2);
        assert_eq!(normalized.observed_length, 1);
    }
}
