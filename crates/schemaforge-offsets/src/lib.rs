//! C8: the offset resolver. For each header cluster, picks the modal
//! `source_index` as the canonical `target_index` and emits one
//! [`SchemaMappingEntry`] per observed (file, source_index) occurrence,
//! with a confidence score derived from per-column type-distribution
//! agreement.

use std::collections::{BTreeMap, HashMap, HashSet};

use camino::Utf8PathBuf;
use schemaforge_types::{ColumnProfileResult, HeaderCluster, SchemaMappingEntry};

const OFFSET_REASON_AUTO: &str = "auto-detected";

/// Looks up the profile recorded for `(file, column_index)` in a
/// `MappingConfig::column_profiles` map keyed by file path string, where
/// each file's profiles are ordered by column index.
fn lookup_profile<'a>(
    profiles: &'a HashMap<String, Vec<ColumnProfileResult>>,
    file: &Utf8PathBuf,
    column_index: usize,
) -> Option<&'a ColumnProfileResult> {
    profiles.get(file.as_str()).and_then(|cols| cols.get(column_index))
}

/// Sums raw type-distribution counts across every profiled variant in a
/// cluster, then normalizes with the null/empty merge, mirroring
/// [`ColumnProfileResult::normalized_distribution_merging_null`] but across
/// many columns at once.
fn cluster_normalized_distribution(profiles_in_cluster: &[&ColumnProfileResult]) -> BTreeMap<String, f64> {
    let mut merged: BTreeMap<String, u64> = BTreeMap::new();
    for profile in profiles_in_cluster {
        for (bucket, count) in &profile.type_distribution {
            let key = if bucket == "null" { "empty" } else { bucket.as_str() };
            *merged.entry(key.to_string()).or_insert(0) += count;
        }
    }
    let total: u64 = merged.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    merged.into_iter().map(|(k, v)| (k, v as f64 / total as f64)).collect()
}

fn l1_confidence(variant: &BTreeMap<String, f64>, canonical: &BTreeMap<String, f64>) -> Option<f64> {
    if variant.is_empty() || canonical.is_empty() {
        return None;
    }
    let keys: HashSet<&String> = variant.keys().chain(canonical.keys()).collect();
    if keys.is_empty() {
        return None;
    }
    let l1: f64 = keys
        .iter()
        .map(|key| (variant.get(*key).copied().unwrap_or(0.0) - canonical.get(*key).copied().unwrap_or(0.0)).abs())
        .sum();
    let raw = 1.0 - l1 / keys.len() as f64;
    Some((raw.clamp(0.0, 1.0) * 100.0).round() / 100.0)
}

fn default_confidence(offset: i64) -> Option<f64> {
    if offset != 0 { Some(1.0) } else { None }
}

/// Picks the modal `source_index`, breaking ties toward the lowest index.
fn modal_target_index(positions: &[(Utf8PathBuf, usize)]) -> usize {
    let mut counts: BTreeMap<usize, u64> = BTreeMap::new();
    for (_, idx) in positions {
        *counts.entry(*idx).or_insert(0) += 1;
    }
    let mut best_index = 0;
    let mut best_count = 0u64;
    for (index, count) in counts {
        if count > best_count || (count == best_count && index < best_index) {
            best_count = count;
            best_index = index;
        }
    }
    best_index
}

/// Resolves per-file column offsets for every cluster.
///
/// `profiles` is `MappingConfig::column_profiles`: per-file, per-column
/// full-pass profiles, used only to score `offset_confidence` when present.
#[must_use]
pub fn resolve_offsets(
    clusters: &[HeaderCluster],
    profiles: &HashMap<String, Vec<ColumnProfileResult>>,
) -> Vec<SchemaMappingEntry> {
    let mut entries = Vec::new();
    for cluster in clusters {
        let positions: Vec<(Utf8PathBuf, usize)> =
            cluster.variants.iter().map(|v| (v.file.clone(), v.column_index)).collect();
        if positions.is_empty() {
            continue;
        }
        let target_index = modal_target_index(&positions);

        let profiles_in_cluster: Vec<&ColumnProfileResult> = cluster
            .variants
            .iter()
            .filter_map(|v| lookup_profile(profiles, &v.file, v.column_index))
            .collect();
        let canonical_distribution = cluster_normalized_distribution(&profiles_in_cluster);

        for variant in &cluster.variants {
            let source_index = variant.column_index;
            let offset = source_index as i64 - target_index as i64;
            let offset_from_index = if offset != 0 { Some(offset) } else { None };
            let variant_profile = lookup_profile(profiles, &variant.file, source_index);
            let confidence = match variant_profile {
                Some(profile) => {
                    let variant_distribution = profile.normalized_distribution_merging_null();
                    l1_confidence(&variant_distribution, &canonical_distribution).or_else(|| default_confidence(offset))
                }
                None => default_confidence(offset),
            };
            entries.push(SchemaMappingEntry {
                file_path: variant.file.clone(),
                source_index,
                canonical_name: cluster.canonical_name.clone(),
                target_index: Some(target_index),
                offset_from_index,
                offset_reason: if offset != 0 { OFFSET_REASON_AUTO.to_string() } else { String::new() },
                offset_confidence: confidence,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_types::HeaderVariant;

    fn variant(file: &str, column_index: usize) -> HeaderVariant {
        HeaderVariant {
            file: Utf8PathBuf::from(file),
            column_index,
            raw_name: "city".to_string(),
            normalized_name: "city".to_string(),
            detected_types: vec!["text".to_string()],
            sample_values: Vec::new(),
            row_count: 10,
        }
    }

    fn cluster(variants: Vec<HeaderVariant>) -> HeaderCluster {
        HeaderCluster {
            canonical_name: "city".to_string(),
            variants,
            confidence: 0.9,
            needs_review: false,
        }
    }

    #[test]
    fn majority_index_becomes_target_with_no_offset_for_itself() {
        let clusters = vec![cluster(vec![variant("a.csv", 1), variant("b.csv", 1), variant("c.csv", 2)])];
        let entries = resolve_offsets(&clusters, &HashMap::new());
        let a = entries.iter().find(|e| e.file_path == Utf8PathBuf::from("a.csv")).unwrap();
        assert_eq!(a.target_index, Some(1));
        assert_eq!(a.offset_from_index, None);
        let c = entries.iter().find(|e| e.file_path == Utf8PathBuf::from("c.csv")).unwrap();
        assert_eq!(c.offset_from_index, Some(1));
        assert_eq!(c.offset_confidence, Some(1.0));
    }

    #[test]
    fn ties_break_toward_lowest_index() {
        let clusters = vec![cluster(vec![variant("a.csv", 3), variant("b.csv", 1)])];
        let entries = resolve_offsets(&clusters, &HashMap::new());
        assert_eq!(entries[0].target_index, Some(1));
    }

    #[test]
    fn profile_agreement_yields_high_confidence() {
        let clusters = vec![cluster(vec![variant("a.csv", 0), variant("b.csv", 1)])];
        let mut profile_a = ColumnProfileResult::new("city");
        profile_a.type_distribution.insert("text".to_string(), 10);
        let mut profile_b = ColumnProfileResult::new("city");
        profile_b.type_distribution.insert("text".to_string(), 8);
        let mut profiles = HashMap::new();
        profiles.insert("a.csv".to_string(), vec![profile_a]);
        profiles.insert("b.csv".to_string(), vec![ColumnProfileResult::new("other"), profile_b]);

        let entries = resolve_offsets(&clusters, &profiles);
        let b_entry = entries.iter().find(|e| e.file_path == Utf8PathBuf::from("b.csv")).unwrap();
        assert_eq!(b_entry.offset_confidence, Some(1.0));
    }

    #[test]
    fn no_profile_data_defaults_confidence() {
        let clusters = vec![cluster(vec![variant("a.csv", 0), variant("b.csv", 1)])];
        let entries = resolve_offsets(&clusters, &HashMap::new());
        let a = entries.iter().find(|e| e.file_path == Utf8PathBuf::from("a.csv")).unwrap();
        assert_eq!(a.offset_confidence, None);
        let b = entries.iter().find(|e| e.file_path == Utf8PathBuf::from("b.csv")).unwrap();
        assert_eq!(b.offset_confidence, Some(1.0));
    }
}
