//! C15: the per-schema materialization runner. Orchestrates the row
//! normalizer (C9), spill buffer (C10), chunked writer (C11), validation
//! tracker (C12, via the writer), and checkpoint registry (C13) over one
//! schema's blocks.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use camino::Utf8PathBuf;
use chrono::Utc;
use schemaforge_checkpoint::CheckpointRegistry;
use schemaforge_normalize::RowNormalizer;
use schemaforge_types::{
    CanonicalSchema, ColumnProfileResult, FileBlock, JobProgressEvent, MappingConfig, SchemaDefinition,
    SchemaforgeError, SpillMetrics, ValidationSummary,
};
use uuid::Uuid;

use crate::csv_writer::CsvBackend;
#[cfg(feature = "sqlite")]
use crate::database_writer::DatabaseBackend;
#[cfg(feature = "parquet")]
use crate::parquet_writer::ParquetBackend;
use crate::spill_buffer::SpillBuffer;
use crate::writer::{ChunkedWriter, SchemaWriter, WriterSnapshot};

/// A `(file_path, line_number)` set shared across schema runs in a job, so
/// a row appearing under two schemas is still emitted only once overall.
pub type GlobalDedupSet = Arc<Mutex<HashSet<(String, u64)>>>;

const CHECKPOINT_PHASE: &str = "materialize";
const ETA_PLAUSIBILITY_CEILING: u64 = 10_000_000;

/// Output format the runner's writer targets.
#[derive(Debug, Clone)]
pub enum WriterFormat {
    Csv,
    #[cfg(feature = "parquet")]
    Parquet,
    #[cfg(feature = "sqlite")]
    Database { db_url: String },
}

/// Settings shared by every schema processed within one materialization job.
pub struct RunnerConfig {
    pub job_id: String,
    pub dest_dir: Utf8PathBuf,
    pub scratch_dir: Utf8PathBuf,
    pub writer_format: WriterFormat,
    pub chunk_rows: u64,
    pub spill_threshold: usize,
    pub progress_granularity: u64,
}

impl RunnerConfig {
    #[must_use]
    pub fn effective_progress_granularity(&self) -> u64 {
        self.progress_granularity.max(self.chunk_rows)
    }
}

/// Result of materializing one schema to completion.
#[derive(Debug, Clone, Default)]
pub struct MaterializationOutcome {
    pub schema_id: Uuid,
    pub blocks_processed: usize,
    pub total_rows: u64,
    pub output_files: Vec<String>,
    pub validation: ValidationSummary,
    pub rows_per_second: f64,
    pub spill_metrics: SpillMetrics,
    /// Set when the run stopped early because `should_cancel` returned
    /// `true` between blocks; the checkpoint is left intact for resume.
    pub cancelled: bool,
}

/// Drives one schema's blocks through the writer pipeline, resuming from
/// whatever checkpoint exists for `(job_id, "materialize/<schema_id>")`.
pub struct SchemaRunner<'a> {
    schema: &'a SchemaDefinition,
    mapping: &'a MappingConfig,
    contract: Option<CanonicalSchema>,
    checkpoints: &'a CheckpointRegistry,
    config: &'a RunnerConfig,
    global_dedup: Option<GlobalDedupSet>,
}

impl<'a> SchemaRunner<'a> {
    #[must_use]
    pub fn new(
        schema: &'a SchemaDefinition,
        mapping: &'a MappingConfig,
        contract: Option<CanonicalSchema>,
        checkpoints: &'a CheckpointRegistry,
        config: &'a RunnerConfig,
        global_dedup: Option<GlobalDedupSet>,
    ) -> Self {
        Self {
            schema,
            mapping,
            contract,
            checkpoints,
            config,
            global_dedup,
        }
    }

    fn checkpoint_phase(&self) -> String {
        format!("{CHECKPOINT_PHASE}/{}", self.schema.id)
    }

    fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                if !col.normalized.is_empty() {
                    col.normalized.clone()
                } else if !col.raw.is_empty() {
                    col.raw.clone()
                } else {
                    format!("column_{}", idx + 1)
                }
            })
            .collect();
        if header.is_empty() {
            header.push("column_1".to_string());
        }
        header
    }

    fn build_writer(&self, header: Vec<String>, resume: Option<WriterSnapshot>) -> Result<Box<dyn SchemaWriter>, SchemaforgeError> {
        let slug = slugify(&self.schema.name);
        let header_len = header.len();
        match &self.config.writer_format {
            WriterFormat::Csv => {
                let backend = CsvBackend::new(header);
                let writer = ChunkedWriter::new(
                    backend,
                    self.config.dest_dir.clone(),
                    slug,
                    header_len,
                    self.config.chunk_rows,
                    self.contract.clone(),
                    resume,
                )?;
                Ok(Box::new(writer))
            }
            #[cfg(feature = "parquet")]
            WriterFormat::Parquet => {
                let backend = ParquetBackend::new(header)?;
                let writer = ChunkedWriter::new(
                    backend,
                    self.config.dest_dir.clone(),
                    slug,
                    header_len,
                    self.config.chunk_rows,
                    self.contract.clone(),
                    resume,
                )?;
                Ok(Box::new(writer))
            }
            #[cfg(feature = "sqlite")]
            WriterFormat::Database { db_url } => {
                let backend = DatabaseBackend::new(db_url, slug.clone(), header)?;
                let writer = ChunkedWriter::new(
                    backend,
                    self.config.dest_dir.clone(),
                    slug,
                    header_len,
                    self.config.chunk_rows,
                    self.contract.clone(),
                    resume,
                )?;
                Ok(Box::new(writer))
            }
        }
    }

    fn profiles_for(&self, file_path: &Utf8PathBuf) -> HashMap<usize, ColumnProfileResult> {
        self.mapping
            .column_profiles
            .get(file_path.as_str())
            .map(|profiles| profiles.iter().cloned().enumerate().collect())
            .unwrap_or_default()
    }

    /// Streams every block belonging to this schema through the writer
    /// pipeline, checkpointing after each block and clearing on success.
    ///
    /// # Errors
    /// Propagates I/O, schema-contract, or writer-construction failures.
    pub fn run(
        &self,
        mut on_progress: impl FnMut(JobProgressEvent),
        mut should_cancel: impl FnMut() -> bool,
    ) -> Result<MaterializationOutcome, SchemaforgeError> {
        let phase = self.checkpoint_phase();
        let resume: Option<WriterSnapshot> = self.checkpoints.load_typed(&self.config.job_id, &phase);
        let start_block = resume.as_ref().map_or(0, |s| s.next_block);

        let mut blocks: Vec<&FileBlock> = self
            .mapping
            .blocks
            .iter()
            .filter(|b| b.schema_id == Some(self.schema.id))
            .collect();
        blocks.sort_by(|a, b| a.file_path.cmp(&b.file_path).then(a.start_line.cmp(&b.start_line)));

        let header = self.header();
        let mut writer = self.build_writer(header, resume)?;
        let mut spill = SpillBuffer::new(self.config.spill_threshold, self.config.scratch_dir.clone());
        let mut normalizers: HashMap<Utf8PathBuf, RowNormalizer> = HashMap::new();
        let mut local_seen: HashSet<(String, u64)> = HashSet::new();

        let total_estimated_rows: u64 = blocks.iter().map(|b| estimate_block_rows(b)).sum();
        let granularity = self.config.effective_progress_granularity();
        let mut processed_rows = writer.total_rows();
        let mut next_emit = processed_rows + granularity;
        let start_time = Instant::now();
        let mut blocks_processed = 0usize;
        let mut cancelled = false;

        for (idx, block) in blocks.iter().enumerate() {
            if idx < start_block {
                blocks_processed += 1;
                continue;
            }
            let normalizer = normalizers
                .entry(block.file_path.clone())
                .or_insert_with(|| RowNormalizer::new(&block.file_path, &self.mapping.schema_mapping, &self.schema.columns));
            let profiles = self.profiles_for(&block.file_path);
            let known_header = self.mapping.file_headers.get(&block.file_path);

            for (line_number, values) in read_block_rows(block)? {
                if block.is_first_block() && line_number == block.start_line {
                    if let Some(expected) = known_header {
                        if expected == &values {
                            continue;
                        }
                    }
                }
                let key = (block.file_path.to_string(), line_number);
                if !local_seen.insert(key.clone()) {
                    continue;
                }
                if let Some(global) = &self.global_dedup {
                    let mut guard = global.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    if !guard.insert(key) {
                        continue;
                    }
                }

                let normalized = normalizer.normalize(&values, &profiles);
                spill.push(normalized, writer.as_mut())?;
                processed_rows += 1;

                if processed_rows >= next_emit || processed_rows == total_estimated_rows {
                    emit_progress(&mut on_progress, self.schema.id, processed_rows, total_estimated_rows, start_time, spill.metrics().rows_spilled);
                    next_emit = processed_rows + granularity;
                }
            }

            blocks_processed += 1;
            spill.flush(writer.as_mut())?;
            let snapshot = writer.snapshot(idx + 1);
            self.checkpoints.save(&self.config.job_id, &phase, &snapshot);

            if should_cancel() {
                cancelled = true;
                break;
            }
        }

        spill.close(writer.as_mut())?;
        writer.close()?;
        if cancelled {
            tracing::info!(schema_id = %self.schema.id, blocks_processed, "materialization cancelled between blocks, checkpoint left intact");
        } else {
            self.checkpoints.clear(&self.config.job_id, &phase);
        }

        let duration = start_time.elapsed().as_secs_f64();
        let rows_written = writer.total_rows();
        let rows_per_second = if duration > 0.0 { rows_written as f64 / duration } else { rows_written as f64 };
        emit_progress(
            &mut on_progress,
            self.schema.id,
            rows_written,
            rows_written.max(total_estimated_rows),
            start_time,
            spill.metrics().rows_spilled,
        );

        Ok(MaterializationOutcome {
            schema_id: self.schema.id,
            blocks_processed,
            total_rows: rows_written,
            output_files: writer.output_files().to_vec(),
            validation: writer.validation_summary(),
            rows_per_second,
            spill_metrics: spill.metrics().clone(),
            cancelled,
        })
    }
}

fn estimate_block_rows(block: &FileBlock) -> u64 {
    if block.end_line < block.start_line {
        0
    } else {
        block.end_line - block.start_line + 1
    }
}

fn emit_progress(
    on_progress: &mut impl FnMut(JobProgressEvent),
    schema_id: Uuid,
    processed_rows: u64,
    total_rows: u64,
    start_time: Instant,
    spill_rows: u64,
) {
    let effective_total = (total_rows > 0 && total_rows <= ETA_PLAUSIBILITY_CEILING).then_some(total_rows);
    let elapsed = start_time.elapsed().as_secs_f64();
    let rows_per_second = if elapsed > 0.0 && processed_rows > 0 { processed_rows as f64 / elapsed } else { 0.0 };
    let eta_seconds = match effective_total {
        Some(total) if rows_per_second > 0.0 => Some((total.saturating_sub(processed_rows)) as f64 / rows_per_second),
        _ => None,
    };
    on_progress(JobProgressEvent {
        schema_id,
        processed_rows,
        total_rows: effective_total,
        eta_seconds,
        rows_per_second,
        spill_rows,
        created_at: Utc::now(),
    });
}

/// Reads one block's `(line_number, cells)` pairs from disk, trimming each
/// cell the way the signature builder does. `line_number` is 0-based, same
/// convention as [`FileBlock::start_line`]/`end_line`.
fn read_block_rows(block: &FileBlock) -> Result<Vec<(u64, Vec<String>)>, SchemaforgeError> {
    let file = std::fs::File::open(&block.file_path).map_err(|source| SchemaforgeError::Io {
        path: block.file_path.to_string(),
        source,
    })?;
    let delimiter = block.signature.delimiter;
    let mut rows = Vec::new();
    for (line_number, line) in BufReader::new(file).lines().enumerate() {
        let line_number = line_number as u64;
        if line_number < block.start_line {
            continue;
        }
        if line_number > block.end_line {
            break;
        }
        let line = line.map_err(|source| SchemaforgeError::Io {
            path: block.file_path.to_string(),
            source,
        })?;
        let values = line.split(delimiter).map(|v| v.trim().to_string()).collect();
        rows.push((line_number, values));
    }
    Ok(rows)
}

fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else {
            slug.push('_');
        }
    }
    while slug.contains("__") {
        slug = slug.replace("__", "_");
    }
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() { "dataset".to_string() } else { trimmed.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_types::{DataType, SchemaColumn};
    use std::io::Write;

    fn schema() -> SchemaDefinition {
        SchemaDefinition {
            id: Uuid::new_v4(),
            name: "People List".to_string(),
            columns: vec![
                SchemaColumn { index: 0, raw: "city".into(), normalized: "city".into(), data_type: DataType::String, known_variants: vec![] },
                SchemaColumn { index: 1, raw: "age".into(), normalized: "age".into(), data_type: DataType::Int, known_variants: vec![] },
            ],
        }
    }

    #[test]
    fn slugify_collapses_separators_and_case() {
        assert_eq!(slugify("People List"), "people_list");
        assert_eq!(slugify("  多重   spaces "), "多重_spaces");
    }

    #[test]
    fn materializes_a_stable_two_file_schema_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Utf8PathBuf::from_path_buf(dir.path().join("out")).unwrap();
        let scratch = Utf8PathBuf::from_path_buf(dir.path().join("scratch")).unwrap();
        let checkpoint_dir = Utf8PathBuf::from_path_buf(dir.path().join("checkpoints")).unwrap();

        let data_path = Utf8PathBuf::from_path_buf(dir.path().join("customers.csv")).unwrap();
        let mut f = std::fs::File::create(&data_path).unwrap();
        writeln!(f, "city,age").unwrap();
        writeln!(f, "Kyiv,30").unwrap();
        writeln!(f, "Lviv,25").unwrap();
        drop(f);

        let schema = schema();
        let mut mapping = MappingConfig::new();
        mapping.file_headers.insert(data_path.clone(), vec!["city".to_string(), "age".to_string()]);
        mapping.schema_mapping = vec![
            schemaforge_types::SchemaMappingEntry {
                file_path: data_path.clone(),
                source_index: 0,
                canonical_name: "city".to_string(),
                target_index: Some(0),
                offset_from_index: None,
                offset_reason: String::new(),
                offset_confidence: None,
            },
            schemaforge_types::SchemaMappingEntry {
                file_path: data_path.clone(),
                source_index: 1,
                canonical_name: "age".to_string(),
                target_index: Some(1),
                offset_from_index: None,
                offset_reason: String::new(),
                offset_confidence: None,
            },
        ];
        mapping.blocks.push(FileBlock {
            file_path: data_path.clone(),
            block_id: 0,
            start_line: 0,
            end_line: 2,
            signature: schemaforge_types::SchemaSignature {
                delimiter: ',',
                column_count: 2,
                header_sample: None,
                columns: HashMap::new(),
            },
            schema_id: Some(schema.id),
        });

        let checkpoints = CheckpointRegistry::new(checkpoint_dir);
        let config = RunnerConfig {
            job_id: "job-1".to_string(),
            dest_dir: dest.clone(),
            scratch_dir: scratch,
            writer_format: WriterFormat::Csv,
            chunk_rows: 10,
            spill_threshold: 10,
            progress_granularity: 1,
        };
        let runner = SchemaRunner::new(&schema, &mapping, None, &checkpoints, &config, None);
        let mut progress_events = Vec::new();
        let outcome = runner.run(|event| progress_events.push(event), || false).unwrap();

        assert_eq!(outcome.total_rows, 2);
        assert!(!progress_events.is_empty());
        assert!(checkpoints.load_typed::<WriterSnapshot>("job-1", &format!("materialize/{}", schema.id)).is_none());
    }

    #[test]
    fn cancelling_between_blocks_leaves_checkpoint_intact() {
        let dir = tempfile::tempdir().unwrap();
        let dest = Utf8PathBuf::from_path_buf(dir.path().join("out")).unwrap();
        let scratch = Utf8PathBuf::from_path_buf(dir.path().join("scratch")).unwrap();
        let checkpoint_dir = Utf8PathBuf::from_path_buf(dir.path().join("checkpoints")).unwrap();

        let mut make_file = |name: &str| -> Utf8PathBuf {
            let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "city,age").unwrap();
            writeln!(f, "Kyiv,30").unwrap();
            path
        };
        let file_a = make_file("a.csv");
        let file_b = make_file("b.csv");

        let schema = schema();
        let mut mapping = MappingConfig::new();
        for path in [&file_a, &file_b] {
            mapping.file_headers.insert(path.clone(), vec!["city".to_string(), "age".to_string()]);
            mapping.schema_mapping.extend([
                schemaforge_types::SchemaMappingEntry {
                    file_path: path.clone(),
                    source_index: 0,
                    canonical_name: "city".to_string(),
                    target_index: Some(0),
                    offset_from_index: None,
                    offset_reason: String::new(),
                    offset_confidence: None,
                },
                schemaforge_types::SchemaMappingEntry {
                    file_path: path.clone(),
                    source_index: 1,
                    canonical_name: "age".to_string(),
                    target_index: Some(1),
                    offset_from_index: None,
                    offset_reason: String::new(),
                    offset_confidence: None,
                },
            ]);
            mapping.blocks.push(FileBlock {
                file_path: path.clone(),
                block_id: 0,
                start_line: 0,
                end_line: 1,
                signature: schemaforge_types::SchemaSignature {
                    delimiter: ',',
                    column_count: 2,
                    header_sample: None,
                    columns: HashMap::new(),
                },
                schema_id: Some(schema.id),
            });
        }

        let checkpoints = CheckpointRegistry::new(checkpoint_dir);
        let config = RunnerConfig {
            job_id: "job-cancel".to_string(),
            dest_dir: dest,
            scratch_dir: scratch,
            writer_format: WriterFormat::Csv,
            chunk_rows: 10,
            spill_threshold: 10,
            progress_granularity: 1,
        };
        let runner = SchemaRunner::new(&schema, &mapping, None, &checkpoints, &config, None);
        let outcome = runner.run(|_| {}, || true).unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.blocks_processed, 1, "only the first block ran before cancellation was observed");
        assert!(
            checkpoints.load_typed::<WriterSnapshot>("job-cancel", &format!("materialize/{}", schema.id)).is_some(),
            "checkpoint must survive a cancelled run so it can resume"
        );
    }
}
