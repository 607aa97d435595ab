//! C7: the header clusterizer. Accumulates per-(file, column) variants
//! across an analysis pass, builds one node per distinct raw header, links
//! nodes via synonym aliases plus fuzzy/type-profile similarity, and
//! synthesizes the final clusters.

use std::collections::{BTreeMap, HashMap, HashSet};

use camino::Utf8PathBuf;
use schemaforge_sampling::FileAnalysisResult;
use schemaforge_types::{ensure_type_buckets, FileBlock, HeaderCluster, HeaderVariant};

use crate::gestalt::ratio;
use crate::slug::{canonical_slug, skeleton, translit};
use crate::synonyms::{build_synonym_map, DEFAULT_SYNONYM_SETS};
use crate::union_find::UnionFind;

const SIMILARITY_THRESHOLD: f64 = 0.78;
const REVIEW_THRESHOLD: f64 = 0.7;
const SAMPLE_CLIP: usize = 32;

fn block_row_count(block: &FileBlock) -> u64 {
    if block.end_line < block.start_line {
        0
    } else {
        block.end_line - block.start_line + 1
    }
}

struct VariantAccumulator {
    file_path: Utf8PathBuf,
    column_index: usize,
    raw_name: String,
    sample_values: HashSet<String>,
    detected_types: BTreeMap<String, u64>,
    row_count: u64,
}

impl VariantAccumulator {
    fn new(file_path: Utf8PathBuf, column_index: usize, raw_name: String) -> Self {
        Self {
            file_path,
            column_index,
            raw_name,
            sample_values: HashSet::new(),
            detected_types: BTreeMap::new(),
            row_count: 0,
        }
    }

    fn update(&mut self, block: &FileBlock, rows: u64) {
        if let Some(stats) = block.signature.columns.get(&self.column_index) {
            for value in &stats.sample_values {
                self.sample_values.insert(value.clone());
            }
            for (bucket, count) in &stats.type_counts {
                *self.detected_types.entry(bucket.clone()).or_insert(0) += count;
            }
        }
        self.row_count += rows;
    }

    fn into_variant(self) -> HeaderVariant {
        let mut sample_values: Vec<String> = self.sample_values.into_iter().collect();
        sample_values.sort();
        sample_values.truncate(SAMPLE_CLIP);
        let normalized = {
            let slug = canonical_slug(&self.raw_name);
            if slug.is_empty() {
                let trimmed = self.raw_name.trim();
                if trimmed.is_empty() {
                    format!("column_{}", self.column_index + 1)
                } else {
                    trimmed.to_string()
                }
            } else {
                slug
            }
        };
        let detected_types: Vec<String> = ensure_type_buckets(&self.detected_types.into_iter().collect())
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(bucket, _)| bucket)
            .collect();
        let raw_name = {
            let trimmed = self.raw_name.trim();
            if trimmed.is_empty() {
                format!("column_{}", self.column_index + 1)
            } else {
                trimmed.to_string()
            }
        };
        HeaderVariant {
            file: self.file_path,
            column_index: self.column_index,
            raw_name,
            normalized_name: normalized,
            detected_types,
            sample_values,
            row_count: self.row_count,
        }
    }
}

/// One distinct raw header, with the slug/alias/skeleton forms used for
/// linking and a per-bucket type-count profile used for dominant-type
/// agreement and confidence scoring.
struct HeaderNode {
    display_name: String,
    slug: String,
    alias: String,
    translit: String,
    skeleton: String,
    type_profile: BTreeMap<String, u64>,
    variants: Vec<HeaderVariant>,
    total_rows: u64,
}

impl HeaderNode {
    fn dominant_type(&self) -> Option<&str> {
        self.type_profile
            .iter()
            .filter(|(_, count)| **count > 0)
            .max_by_key(|(_, count)| **count)
            .map(|(bucket, _)| bucket.as_str())
    }
}

fn resolved_headers(result: &FileAnalysisResult, file_headers: &HashMap<Utf8PathBuf, Vec<String>>) -> Vec<String> {
    let mut headers: Vec<String> = file_headers
        .get(&result.file_path)
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let max_columns = result
        .blocks
        .iter()
        .map(|b| b.signature.column_count)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    while headers.len() < max_columns {
        let idx = headers.len();
        headers.push(format!("column_{}", idx + 1));
    }
    if headers.is_empty() {
        headers.push("column_1".to_string());
    }
    headers
}

fn accumulate_variants(
    results: &[FileAnalysisResult],
    file_headers: &HashMap<Utf8PathBuf, Vec<String>>,
) -> Vec<VariantAccumulator> {
    let mut accumulators: HashMap<(Utf8PathBuf, usize), VariantAccumulator> = HashMap::new();
    for result in results {
        let headers = resolved_headers(result, file_headers);
        let max_columns = headers.len();
        for block in &result.blocks {
            let column_count = if block.signature.column_count > 0 {
                block.signature.column_count
            } else {
                max_columns
            };
            let row_count = block_row_count(block);
            for idx in 0..column_count.max(max_columns) {
                let raw_name = headers.get(idx).cloned().unwrap_or_else(|| format!("column_{}", idx + 1));
                let key = (block.file_path.clone(), idx);
                let accumulator = accumulators
                    .entry(key)
                    .or_insert_with(|| VariantAccumulator::new(block.file_path.clone(), idx, raw_name.clone()));
                if accumulator.raw_name.trim().is_empty() && !raw_name.trim().is_empty() {
                    accumulator.raw_name = raw_name;
                }
                accumulator.update(block, row_count);
            }
        }
    }
    accumulators.into_values().collect()
}

fn build_nodes(accumulators: Vec<VariantAccumulator>, synonym_map: &HashMap<String, String>) -> Vec<HeaderNode> {
    let mut nodes: HashMap<String, HeaderNode> = HashMap::new();
    for accumulator in accumulators {
        let slug = canonical_slug(&accumulator.raw_name);
        let alias = synonym_map.get(&slug).cloned().unwrap_or_else(|| slug.clone());
        let translit_form = translit(&slug);
        let skeleton_form = skeleton(&slug);
        let type_profile = accumulator.detected_types.clone();
        let key = {
            let trimmed = accumulator.raw_name.trim();
            if trimmed.is_empty() {
                format!("column_{}", accumulator.column_index + 1)
            } else {
                trimmed.to_string()
            }
        };
        let variant = accumulator.into_variant();
        let node = nodes.entry(key).or_insert_with(|| HeaderNode {
            display_name: variant.raw_name.clone(),
            slug,
            alias,
            translit: translit_form,
            skeleton: skeleton_form,
            type_profile: BTreeMap::new(),
            variants: Vec::new(),
            total_rows: 0,
        });
        for (bucket, count) in type_profile {
            *node.type_profile.entry(bucket).or_insert(0) += count;
        }
        node.total_rows += variant.row_count;
        node.variants.push(variant);
    }
    nodes.into_values().collect()
}

fn should_link(left: &HeaderNode, right: &HeaderNode) -> bool {
    if !left.alias.is_empty() && left.alias == right.alias {
        return true;
    }
    if left.slug.is_empty() || right.slug.is_empty() {
        return false;
    }
    if let (Some(left_type), Some(right_type)) = (left.dominant_type(), right.dominant_type()) {
        if left_type != right_type {
            return false;
        }
    }
    if ratio(&left.slug, &right.slug) >= SIMILARITY_THRESHOLD {
        return true;
    }
    if !left.translit.is_empty() && left.translit == right.translit {
        return true;
    }
    if !left.skeleton.is_empty() && left.skeleton == right.skeleton && left.skeleton.len() >= 3 {
        return true;
    }
    let short_hand = left.slug.len() <= 4 || right.slug.len() <= 4;
    let prefix_match = left.slug.starts_with(&right.slug) || right.slug.starts_with(&left.slug);
    short_hand && prefix_match
}

fn link_nodes(nodes: Vec<HeaderNode>) -> Vec<Vec<HeaderNode>> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let mut uf = UnionFind::new(nodes.len());

    let mut alias_buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        if !node.alias.is_empty() {
            alias_buckets.entry(node.alias.as_str()).or_default().push(i);
        }
    }
    for indices in alias_buckets.values() {
        for window in indices.windows(2) {
            uf.union(window[0], window[1]);
        }
    }

    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if should_link(&nodes[i], &nodes[j]) {
                uf.union(i, j);
            }
        }
    }

    let groups = uf.groups();
    let mut nodes: Vec<Option<HeaderNode>> = nodes.into_iter().map(Some).collect();
    groups
        .into_iter()
        .map(|indices| {
            indices
                .into_iter()
                .filter_map(|i| nodes[i].take())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn select_canonical_name(nodes: &[HeaderNode]) -> String {
    nodes
        .iter()
        .max_by(|a, b| {
            let score = |n: &HeaderNode| {
                let penalty = if n.display_name.to_lowercase().starts_with("column_") { 0.25 } else { 0.0 };
                n.total_rows as f64 * (1.0 - penalty)
            };
            score(a).partial_cmp(&score(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|n| n.display_name.clone())
        .unwrap_or_default()
}

fn compute_confidence(type_counter: &BTreeMap<String, u64>, variants: &[HeaderVariant]) -> f64 {
    let total: u64 = type_counter.values().sum();
    let purity = if total == 0 {
        1.0
    } else {
        *type_counter.values().max().unwrap_or(&0) as f64 / total as f64
    };
    let unique_sources: HashSet<(Utf8PathBuf, usize)> =
        variants.iter().map(|v| (v.file.clone(), v.column_index)).collect();
    let coverage = (unique_sources.len() as f64 / 4.0).min(1.0);
    let confidence = 0.35 + 0.4 * purity + 0.25 * coverage;
    (confidence.clamp(0.35, 1.0) * 100.0).round() / 100.0
}

fn build_cluster(nodes: Vec<HeaderNode>) -> HeaderCluster {
    let mut type_counter: BTreeMap<String, u64> = BTreeMap::new();
    let mut variants: Vec<HeaderVariant> = Vec::new();
    for node in &nodes {
        for (bucket, count) in &node.type_profile {
            *type_counter.entry(bucket.clone()).or_insert(0) += count;
        }
    }
    let single_node = nodes.len() == 1;
    let canonical_name = select_canonical_name(&nodes);
    for node in nodes {
        variants.extend(node.variants);
    }
    variants.sort_by(|a, b| (a.file.as_str(), a.column_index).cmp(&(b.file.as_str(), b.column_index)));
    let confidence = compute_confidence(&type_counter, &variants);
    let needs_review = confidence < REVIEW_THRESHOLD || single_node;
    HeaderCluster {
        canonical_name,
        variants,
        confidence,
        needs_review,
    }
}

/// Builds header clusters from an analysis pass across one or more files.
///
/// `file_headers` supplies each file's raw header row (the clusterizer has
/// no access to line 1 text otherwise: block signatures only carry column
/// counts and per-column type stats, not header strings).
#[must_use]
pub fn build(results: &[FileAnalysisResult], file_headers: &HashMap<Utf8PathBuf, Vec<String>>) -> Vec<HeaderCluster> {
    if results.is_empty() {
        return Vec::new();
    }
    let accumulators = accumulate_variants(results, file_headers);
    if accumulators.is_empty() {
        return Vec::new();
    }
    let synonym_map = build_synonym_map(DEFAULT_SYNONYM_SETS);
    let nodes = build_nodes(accumulators, &synonym_map);
    if nodes.is_empty() {
        return Vec::new();
    }
    let groups = link_nodes(nodes);
    let mut clusters: Vec<HeaderCluster> = groups.into_iter().map(build_cluster).collect();
    clusters.sort_by(|a, b| a.canonical_name.to_lowercase().cmp(&b.canonical_name.to_lowercase()));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_types::{ColumnStats, SchemaSignature, TypeBucket};

    fn block(file: &str, block_id: usize, start: u64, end: u64, headers: &[&str], rows: &[&[&str]]) -> FileBlock {
        let mut columns = HashMap::new();
        for (idx, _) in headers.iter().enumerate() {
            let mut stats = ColumnStats::new(idx);
            for row in rows {
                if let Some(value) = row.get(idx) {
                    stats.observe(value, TypeBucket::Text, 8);
                }
            }
            columns.insert(idx, stats);
        }
        FileBlock {
            file_path: Utf8PathBuf::from(file),
            block_id,
            start_line: start,
            end_line: end,
            signature: SchemaSignature {
                delimiter: ',',
                column_count: headers.len(),
                header_sample: None,
                columns,
            },
            schema_id: None,
        }
    }

    fn analysis_result(file: &str, blocks: Vec<FileBlock>) -> FileAnalysisResult {
        FileAnalysisResult {
            file_path: Utf8PathBuf::from(file),
            total_lines: blocks.iter().map(|b| b.end_line + 1).max().unwrap_or(0),
            blocks,
        }
    }

    #[test]
    fn synonym_headers_across_files_cluster_together() {
        let mut headers = HashMap::new();
        headers.insert(Utf8PathBuf::from("a.csv"), vec!["month".to_string(), "value".to_string()]);
        headers.insert(Utf8PathBuf::from("b.csv"), vec!["місяць".to_string(), "value".to_string()]);

        let results = vec![
            analysis_result("a.csv", vec![block("a.csv", 0, 0, 5, &["month", "value"], &[&["1", "10"]])]),
            analysis_result("b.csv", vec![block("b.csv", 0, 0, 5, &["місяць", "value"], &[&["1", "10"]])]),
        ];

        let clusters = build(&results, &headers);
        let month_cluster = clusters
            .iter()
            .find(|c| c.variants.iter().any(|v| v.raw_name == "month"))
            .expect("month cluster present");
        assert_eq!(month_cluster.unique_source_count(), 2);
        assert!(!month_cluster.needs_review, "cross-file synonym match should not need review");
        assert!(month_cluster.confidence >= REVIEW_THRESHOLD);
    }

    #[test]
    fn unrelated_headers_stay_in_separate_clusters() {
        let mut headers = HashMap::new();
        headers.insert(Utf8PathBuf::from("a.csv"), vec!["month".to_string(), "zzzzz_unique".to_string()]);
        let results = vec![analysis_result(
            "a.csv",
            vec![block("a.csv", 0, 0, 5, &["month", "zzzzz_unique"], &[&["1", "x"]])],
        )];
        let clusters = build(&results, &headers);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(build(&[], &HashMap::new()).is_empty());
    }

    #[test]
    fn single_variant_cluster_needs_review() {
        let mut headers = HashMap::new();
        headers.insert(Utf8PathBuf::from("a.csv"), vec!["only_here".to_string()]);
        let results = vec![analysis_result("a.csv", vec![block("a.csv", 0, 0, 2, &["only_here"], &[&["1"]])])];
        let clusters = build(&results, &headers);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].needs_review);
    }
}
