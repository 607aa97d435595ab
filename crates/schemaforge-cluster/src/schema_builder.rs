//! Bootstraps [`SchemaDefinition`]s from raw blocks and assigns each
//! [`FileBlock`]'s `schema_id`, run once after analysis and before header
//! clustering links columns across schemas.
//!
//! Grounded on `MappingService.cluster`/`_schema_from_signature` in the
//! original implementation: blocks with the same delimiter, column count,
//! and header text are judged to share a schema. That original keyed the
//! group on `signature.header_sample`, the raw header line; this port's
//! `header_sample` is reserved for the encoding sentinel (see
//! `SchemaSignature::encoding_hint`), so the header text comes from
//! `MappingConfig::file_headers` instead.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use schemaforge_types::{ColumnStats, DataType, FileBlock, SchemaColumn, SchemaDefinition};

use crate::slug::canonical_slug;
use crate::synonyms::{build_synonym_map, DEFAULT_SYNONYM_SETS};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClusterKey {
    delimiter: char,
    column_count: usize,
    header_key: String,
}

fn header_for(block: &FileBlock, file_headers: &HashMap<Utf8PathBuf, Vec<String>>) -> Vec<String> {
    file_headers.get(&block.file_path).cloned().unwrap_or_default()
}

fn cluster_key(block: &FileBlock, file_headers: &HashMap<Utf8PathBuf, Vec<String>>) -> ClusterKey {
    let header = header_for(block, file_headers);
    let header_key = header.join("\u{1f}").trim().to_lowercase();
    ClusterKey {
        delimiter: block.signature.delimiter,
        column_count: block.signature.column_count,
        header_key,
    }
}

/// Majority-vote type inference over a column's bucket counts, refining the
/// original's coarser bool/decimal/date/string split with the richer
/// [`DataType`] set this port carries (int vs. float distinguished by which
/// bucket dominates, rather than collapsing both into "decimal").
fn infer_data_type(stats: Option<&ColumnStats>) -> DataType {
    let Some(stats) = stats else {
        return DataType::String;
    };
    if stats.maybe_bool {
        return DataType::Bool;
    }
    if stats.maybe_numeric {
        let integer_count = stats.type_counts.get("integer").copied().unwrap_or(0);
        let float_count = stats.type_counts.get("float").copied().unwrap_or(0);
        if float_count > integer_count {
            return DataType::Float;
        }
        if integer_count > 0 {
            return DataType::Int;
        }
    }
    if stats.maybe_date {
        return DataType::Date;
    }
    DataType::String
}

fn schema_from_group(header: &[String], column_count: usize, stats_by_index: &HashMap<usize, ColumnStats>) -> SchemaDefinition {
    let synonym_map = build_synonym_map(DEFAULT_SYNONYM_SETS);
    let total_columns = if column_count > 0 { column_count } else { header.len() };
    let mut columns = Vec::with_capacity(total_columns);
    for index in 0..total_columns {
        let raw = header.get(index).cloned().unwrap_or_else(|| format!("column_{}", index + 1));
        let slug = canonical_slug(&raw);
        let normalized = synonym_map.get(&slug).cloned().unwrap_or(slug);
        let data_type = infer_data_type(stats_by_index.get(&index));
        columns.push(SchemaColumn {
            index,
            raw: raw.clone(),
            normalized: normalized.clone(),
            data_type,
            known_variants: vec![raw, normalized],
        });
    }
    let name = header
        .first()
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("schema_{total_columns}"));
    SchemaDefinition {
        id: uuid::Uuid::new_v4(),
        name,
        columns,
    }
}

/// Groups `blocks` by (delimiter, column count, header text), builds one
/// [`SchemaDefinition`] per group, and writes `schema_id` back onto each
/// block in place.
#[must_use]
pub fn bootstrap_schemas(
    blocks: &mut [FileBlock],
    file_headers: &HashMap<Utf8PathBuf, Vec<String>>,
) -> Vec<SchemaDefinition> {
    let mut group_order: Vec<ClusterKey> = Vec::new();
    let mut groups: HashMap<ClusterKey, Vec<usize>> = HashMap::new();
    for (i, block) in blocks.iter().enumerate() {
        let key = cluster_key(block, file_headers);
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(i);
    }

    let mut schemas = Vec::with_capacity(group_order.len());
    for key in group_order {
        let indices = &groups[&key];
        let first = &blocks[indices[0]];
        let header = header_for(first, file_headers);
        let schema = schema_from_group(&header, first.signature.column_count, &first.signature.columns);
        for &idx in indices {
            blocks[idx].schema_id = Some(schema.id);
        }
        schemas.push(schema);
    }
    schemas.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_types::SchemaSignature;

    fn block(file: &str, delimiter: char, column_count: usize) -> FileBlock {
        FileBlock {
            file_path: Utf8PathBuf::from(file),
            block_id: 0,
            start_line: 0,
            end_line: 10,
            signature: SchemaSignature {
                delimiter,
                column_count,
                header_sample: None,
                columns: HashMap::new(),
            },
            schema_id: None,
        }
    }

    #[test]
    fn files_with_matching_headers_share_one_schema() {
        let mut blocks = vec![block("a.csv", ',', 2), block("b.csv", ',', 2)];
        let mut headers = HashMap::new();
        headers.insert(Utf8PathBuf::from("a.csv"), vec!["City".to_string(), "Age".to_string()]);
        headers.insert(Utf8PathBuf::from("b.csv"), vec!["City".to_string(), "Age".to_string()]);

        let schemas = bootstrap_schemas(&mut blocks, &headers);
        assert_eq!(schemas.len(), 1);
        assert_eq!(blocks[0].schema_id, blocks[1].schema_id);
    }

    #[test]
    fn differing_column_counts_split_into_separate_schemas() {
        let mut blocks = vec![block("a.csv", ',', 2), block("b.csv", ',', 3)];
        let mut headers = HashMap::new();
        headers.insert(Utf8PathBuf::from("a.csv"), vec!["City".to_string(), "Age".to_string()]);
        headers.insert(
            Utf8PathBuf::from("b.csv"),
            vec!["City".to_string(), "Age".to_string(), "Extra".to_string()],
        );

        let schemas = bootstrap_schemas(&mut blocks, &headers);
        assert_eq!(schemas.len(), 2);
        assert_ne!(blocks[0].schema_id, blocks[1].schema_id);
    }

    #[test]
    fn unnamed_header_falls_back_to_column_placeholders() {
        let mut blocks = vec![block("a.csv", ',', 2)];
        let schemas = bootstrap_schemas(&mut blocks, &HashMap::new());
        assert_eq!(schemas[0].columns[0].raw, "column_1");
    }
}
