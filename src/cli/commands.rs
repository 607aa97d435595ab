//! Subcommand implementations, grounded on the teacher's `cli/commands.rs`
//! split (one function per [`Commands`](super::args::Commands) variant) and
//! the original `command_analyze`/`command_benchmark`/`command_review`/
//! `command_normalize`/`command_materialize` workflow shell.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use schemaforge_checkpoint::CheckpointRegistry;
use schemaforge_config::{CliArgs as ConfigCliArgs, Config};
use schemaforge_materialize::{MaterializationOutcome, RunnerConfig, SchemaRunner, WriterFormat};
use schemaforge_resources::{ResourceLimits, ResourceManager};
use schemaforge_sampling::{AnalysisEngine, AnalysisSettings, FileAnalysisResult};
use schemaforge_storage::{JobStore, JsonMappingStore, MappingStore};
use schemaforge_types::{FileBlock, JobMetrics, JobProgressEvent, JobState, MappingConfig};

use super::args::{Commands, WriterFormatArg};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// Collects input files from a mix of file and directory arguments,
/// filtering directories to supported extensions and deduplicating.
fn collect_input_files(inputs: &[Utf8PathBuf]) -> Vec<Utf8PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        collect_recursive(input, &mut files);
    }
    files.sort();
    files.dedup();
    files
}

fn collect_recursive(path: &Utf8Path, out: &mut Vec<Utf8PathBuf>) {
    if path.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else { return };
        let mut children: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        children.sort();
        for child in children {
            if let Ok(utf8_child) = Utf8PathBuf::from_path_buf(child) {
                collect_recursive(&utf8_child, out);
            }
        }
    } else if path.is_file() {
        let is_supported = path
            .extension()
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_supported {
            out.push(path.to_path_buf());
        }
    }
}

fn config_cli_args(config_path: Option<Utf8PathBuf>, profile: Option<String>) -> ConfigCliArgs {
    ConfigCliArgs {
        config_path,
        profile,
        ..Default::default()
    }
}

fn analysis_settings(config: &Config) -> AnalysisSettings {
    AnalysisSettings {
        encoding: config.global.encoding.clone(),
        block_size: config.active_profile.block_size,
        min_gap_lines: config.active_profile.min_gap_lines,
        sample_values_cap: config.active_profile.sample_values_cap,
        max_parallel_files: config.active_profile.max_parallel_files as usize,
    }
}

fn resource_limits(config: &Config) -> ResourceLimits {
    let limits = &config.active_profile.resource_limits;
    ResourceLimits {
        memory_mb: limits.memory_mb,
        spill_mb: limits.spill_mb,
        max_workers: limits.max_workers,
        temp_dir: limits.temp_dir.clone(),
    }
}

/// Reads a block's recorded header text straight off disk: the first line
/// of the file, split by the block's detected delimiter. Used once per
/// file, at its first (`block_id == 0`) block.
fn read_file_header(path: &Utf8Path, delimiter: char) -> Result<Vec<String>> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {path} to read its header"))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .with_context(|| format!("reading header line from {path}"))?;
    Ok(first_line
        .trim_end_matches(['\n', '\r'])
        .split(delimiter)
        .map(|cell| cell.trim().to_string())
        .collect())
}

async fn run_analysis(files: &[Utf8PathBuf], settings: &AnalysisSettings) -> Vec<FileAnalysisResult> {
    let engine = AnalysisEngine::new(settings.clone());
    let results = engine.analyze_files(files).await;
    let mut analyzed = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(result) => analyzed.push(result),
            Err(err) => tracing::warn!(file = %path, error = %err, "analysis failed for file, skipping"),
        }
    }
    analyzed
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("creating async runtime")
}

/// Maps a user-supplied `--job-id` string to a stable UUID, so the same
/// string passed to `analyze`, `review`, and `materialize` addresses one
/// job-lifecycle record. Falls back to a namespaced v5 UUID when the string
/// isn't itself a UUID.
fn job_uuid(job_id: &str) -> uuid::Uuid {
    job_id.parse().unwrap_or_else(|_| uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, job_id.as_bytes()))
}

/// The C14 state machine plus the store backing it, held together so a
/// command can both drive transitions and persist per-schema metrics
/// without opening the database twice.
struct JobLifecycle {
    store: Arc<dyn JobStore + Send + Sync>,
    machine: schemaforge_storage::JobStateMachine,
}

impl JobLifecycle {
    /// Opens the sqlite-backed job store and registers a state machine for
    /// `job_id`. Returns `Ok(None)` when no `--sqlite-db` was given, or when
    /// this build lacks the `sqlite` feature (mirrors `maybe_persist_sqlite`'s
    /// no-op-when-absent shape).
    fn open(sqlite_db: Option<&Utf8PathBuf>, job_id: &str) -> Result<Option<Self>> {
        let Some(_db_path) = sqlite_db else { return Ok(None) };
        #[cfg(feature = "sqlite")]
        {
            let store: Arc<dyn JobStore + Send + Sync> = Arc::new(
                schemaforge_storage::SqliteJobStore::new(_db_path.clone())
                    .with_context(|| format!("opening sqlite db {_db_path} for job lifecycle"))?,
            );
            let machine = schemaforge_storage::JobStateMachine::new(job_uuid(job_id), store.clone())
                .map_err(anyhow::Error::from)
                .context("registering job state machine")?;
            Ok(Some(Self { store, machine }))
        }
        #[cfg(not(feature = "sqlite"))]
        {
            tracing::warn!("--sqlite-db given but this build lacks the `sqlite` feature; job lifecycle will not be recorded");
            Ok(None)
        }
    }

    fn transition(&self, state: JobState, message: &str) -> Result<()> {
        self.machine
            .transition(state, Some(message.to_string()))
            .map_err(anyhow::Error::from)
            .with_context(|| format!("transitioning job to {state:?}"))
    }

    fn mark_failed(&self, message: &str) {
        if let Err(err) = self.machine.mark_failed(Some(message.to_string())) {
            tracing::warn!(error = %err, "failed to record job failure");
        }
    }

    fn is_cancelled(&self) -> bool {
        self.machine.state() == JobState::Cancelled
    }

    fn record_metrics(&self, metrics: &JobMetrics) -> Result<()> {
        self.store.record_metrics(metrics).context("persisting job metrics")
    }
}

pub fn analyze(
    inputs: &[Utf8PathBuf],
    output: &Utf8PathBuf,
    sqlite_db: Option<&Utf8PathBuf>,
    config_path: Option<Utf8PathBuf>,
    profile: Option<String>,
    job_id: Option<String>,
) -> Result<()> {
    let files = collect_input_files(inputs);
    anyhow::ensure!(!files.is_empty(), "no input files found under {inputs:?}");

    let job_id = job_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let lifecycle = JobLifecycle::open(sqlite_db, &job_id)?;
    if let Some(lifecycle) = &lifecycle {
        lifecycle.transition(JobState::Analyzing, "analysis started")?;
    }

    let config = Config::discover(&config_cli_args(config_path, profile)).context("loading configuration")?;
    let settings = analysis_settings(&config);
    println!(
        "Starting analysis for {} file(s) using profile '{}' (block_size={}, parallel={})",
        files.len(),
        config.active_profile_name,
        settings.block_size,
        settings.max_parallel_files
    );

    let rt = runtime()?;
    let results = rt.block_on(run_analysis(&files, &settings));

    let mut mapping = MappingConfig::new();
    let mut blocks: Vec<FileBlock> = Vec::new();
    for result in &results {
        blocks.extend(result.blocks.iter().cloned());
        if let Some(first) = result.blocks.first() {
            let header = read_file_header(&result.file_path, first.signature.delimiter)
                .unwrap_or_else(|err| {
                    tracing::warn!(file = %result.file_path, error = %err, "could not read header line");
                    Vec::new()
                });
            mapping.file_headers.insert(result.file_path.clone(), header);
            if let Ok(profiles) = schemaforge_sampling::profile_file_columns(&result.file_path, first.signature.delimiter) {
                mapping.column_profiles.insert(result.file_path.to_string(), profiles);
            }
        }
    }

    let schemas = schemaforge_cluster::bootstrap_schemas(&mut blocks, &mapping.file_headers);
    mapping.blocks = blocks;
    mapping.schemas = schemas;

    JsonMappingStore::new(output.clone())
        .save(&mapping)
        .with_context(|| format!("writing mapping to {output}"))?;
    maybe_persist_sqlite(&mapping, sqlite_db)?;

    println!(
        "Wrote mapping with {} block(s) across {} schema(s) to {output}. Job id: {job_id}",
        mapping.blocks.len(),
        mapping.schemas.len()
    );
    Ok(())
}

pub fn benchmark(inputs: &[Utf8PathBuf], log: Option<&Utf8PathBuf>, config_path: Option<Utf8PathBuf>, profile: Option<String>) -> Result<()> {
    let files = collect_input_files(inputs);
    anyhow::ensure!(!files.is_empty(), "no input files found for benchmark");

    let config = Config::discover(&config_cli_args(config_path, profile)).context("loading configuration")?;
    let settings = analysis_settings(&config);

    let rt = runtime()?;
    let start = Instant::now();
    let results = rt.block_on(run_analysis(&files, &settings));
    let duration = start.elapsed().as_secs_f64();
    let total_rows: u64 = results.iter().map(|r| r.total_lines).sum();
    let throughput = if duration > 0.0 { total_rows as f64 / duration } else { 0.0 };

    if let Some(log_path) = log {
        let record = serde_json::json!({
            "dataset": inputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            "seconds": duration,
            "rows": total_rows,
            "rows_per_second": throughput,
            "recorded_at": Utc::now().to_rfc3339(),
        });
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("opening benchmark log {log_path}"))?;
        writeln!(file, "{record}").context("appending benchmark record")?;
    }

    println!("Benchmark complete: {} file(s) in {duration:.2}s, throughput {throughput:.0} rows/s", files.len());
    Ok(())
}

fn file_analysis_results_from_blocks(blocks: &[FileBlock]) -> Vec<FileAnalysisResult> {
    let mut by_file: HashMap<Utf8PathBuf, Vec<FileBlock>> = HashMap::new();
    for block in blocks {
        by_file.entry(block.file_path.clone()).or_default().push(block.clone());
    }
    by_file
        .into_iter()
        .map(|(file_path, blocks)| {
            let total_lines = blocks.iter().map(|b| b.end_line + 1).max().unwrap_or(0);
            FileAnalysisResult { file_path, total_lines, blocks }
        })
        .collect()
}

pub fn review(mapping_path: &Utf8PathBuf, output: &Utf8PathBuf, sqlite_db: Option<&Utf8PathBuf>, job_id: Option<String>) -> Result<()> {
    if let Some(job_id) = &job_id {
        if let Some(lifecycle) = JobLifecycle::open(sqlite_db, job_id)? {
            lifecycle.transition(JobState::Mapping, "header clustering started")?;
        }
    }

    let mut mapping = JsonMappingStore::new(mapping_path.clone())
        .load()
        .with_context(|| format!("loading mapping from {mapping_path}"))?;

    let results = file_analysis_results_from_blocks(&mapping.blocks);
    let clusters = schemaforge_cluster::build(&results, &mapping.file_headers);
    let schema_mapping = schemaforge_offsets::resolve_offsets(&clusters, &mapping.column_profiles);

    mapping.header_clusters = clusters;
    mapping.schema_mapping = schema_mapping;

    JsonMappingStore::new(output.clone())
        .save(&mapping)
        .with_context(|| format!("writing mapping to {output}"))?;
    maybe_persist_sqlite(&mapping, sqlite_db)?;

    println!(
        "Clustered {} block(s) into {} header cluster(s), {} schema mapping entries. Output: {output}",
        mapping.blocks.len(),
        mapping.header_clusters.len(),
        mapping.schema_mapping.len()
    );
    Ok(())
}

pub fn normalize(mapping_path: &Utf8PathBuf, output: &Utf8PathBuf, sqlite_db: Option<&Utf8PathBuf>) -> Result<()> {
    let mut mapping = JsonMappingStore::new(mapping_path.clone())
        .load()
        .with_context(|| format!("loading mapping from {mapping_path}"))?;

    let synonym_map = schemaforge_cluster::build_synonym_map(schemaforge_cluster::DEFAULT_SYNONYM_SETS);
    for schema in &mut mapping.schemas {
        for column in &mut schema.columns {
            let slug = schemaforge_cluster::canonical_slug(&column.raw);
            column.normalized = synonym_map.get(&slug).cloned().unwrap_or(slug);
        }
    }

    JsonMappingStore::new(output.clone())
        .save(&mapping)
        .with_context(|| format!("writing mapping to {output}"))?;
    maybe_persist_sqlite(&mapping, sqlite_db)?;

    println!("Applied synonym dictionary to {} schema(s). Output: {output}", mapping.schemas.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn materialize(
    mapping_path: &Utf8PathBuf,
    dest: &Utf8PathBuf,
    plan: &Utf8PathBuf,
    checkpoint_dir: &Utf8PathBuf,
    writer_format: WriterFormatArg,
    spill_threshold: usize,
    telemetry_log: Option<&Utf8PathBuf>,
    db_url: Option<&str>,
    sqlite_db: Option<&Utf8PathBuf>,
    job_id: Option<String>,
    resume: Option<String>,
    config_path: Option<Utf8PathBuf>,
    profile: Option<String>,
) -> Result<()> {
    if matches!(writer_format, WriterFormatArg::Database) && db_url.is_none() {
        anyhow::bail!("--db-url is required when --writer-format=database");
    }

    let mapping = JsonMappingStore::new(mapping_path.clone())
        .load()
        .with_context(|| format!("loading mapping from {mapping_path}"))?;
    anyhow::ensure!(!mapping.schemas.is_empty(), "mapping has no schemas; run `review` before `materialize`");

    let job_id = match (job_id, resume) {
        (Some(job_id), _) => job_id,
        (None, Some(resume_id)) => {
            anyhow::ensure!(
                has_any_checkpoint(checkpoint_dir, &resume_id),
                "--resume {resume_id}: no checkpoint found under {checkpoint_dir} to resume from"
            );
            resume_id
        }
        (None, None) => uuid::Uuid::new_v4().to_string(),
    };

    let config = Config::discover(&config_cli_args(config_path, profile)).context("loading configuration")?;
    let resources = ResourceManager::new(resource_limits(&config)).context("initializing resource manager")?;
    let scratch_dir = resources.scratch_dir(&job_id, &["materialize"]).context("creating scratch directory")?;

    let lifecycle = JobLifecycle::open(sqlite_db, &job_id)?;
    if let Some(lifecycle) = &lifecycle {
        lifecycle.transition(JobState::Materializing, "materialization started")?;
    }

    let runner_writer_format = match writer_format {
        WriterFormatArg::Csv => WriterFormat::Csv,
        #[cfg(feature = "parquet")]
        WriterFormatArg::Parquet => WriterFormat::Parquet,
        #[cfg(not(feature = "parquet"))]
        WriterFormatArg::Parquet => anyhow::bail!("this build was not compiled with the `parquet` feature"),
        #[cfg(feature = "sqlite")]
        WriterFormatArg::Database => WriterFormat::Database { db_url: db_url.unwrap().to_string() },
        #[cfg(not(feature = "sqlite"))]
        WriterFormatArg::Database => anyhow::bail!("this build was not compiled with the `sqlite` feature"),
    };

    let checkpoints = CheckpointRegistry::new(checkpoint_dir.clone());
    let runner_config = RunnerConfig {
        job_id: job_id.clone(),
        dest_dir: dest.clone(),
        scratch_dir,
        writer_format: runner_writer_format,
        chunk_rows: config.active_profile.writer_chunk_rows,
        spill_threshold,
        progress_granularity: config.active_profile.writer_chunk_rows,
    };

    let outcome = run_schemas(&mapping, &checkpoints, &runner_config, &job_id, telemetry_log, lifecycle.as_ref());
    let total_rows = match outcome {
        Ok(total_rows) => total_rows,
        Err(err) => {
            if let Some(lifecycle) = &lifecycle {
                lifecycle.mark_failed(&err.to_string());
            }
            return Err(err);
        }
    };

    if let Some(lifecycle) = &lifecycle {
        lifecycle.transition(JobState::Validating, "writers closed, validating output")?;
        lifecycle.transition(JobState::Done, "materialization complete")?;
    }

    let plan_document = serde_json::json!({
        "job_id": job_id,
        "dest_dir": dest.to_string(),
        "schemas": mapping.schemas.iter().map(|s| s.name.clone()).collect::<Vec<_>>(),
        "total_rows": total_rows,
    });
    std::fs::write(plan, serde_json::to_vec_pretty(&plan_document)?).with_context(|| format!("writing plan to {plan}"))?;
    maybe_persist_sqlite(&mapping, sqlite_db)?;

    println!("Materialized {} schema job(s) -> {dest}. Rows written: {total_rows}. Plan saved to {plan}.", mapping.schemas.len());
    Ok(())
}

/// Checks whether `checkpoint_dir` holds a checkpoint file for `job_id`
/// under any phase subdirectory, matching [`CheckpointRegistry`]'s
/// `<phase>/<job_id>.json` layout. Used to make `--resume` fail fast
/// instead of silently materializing as a fresh job under that id.
fn has_any_checkpoint(checkpoint_dir: &Utf8PathBuf, job_id: &str) -> bool {
    let safe_job = job_id.replace(std::path::MAIN_SEPARATOR, "_");
    let Ok(phases) = std::fs::read_dir(checkpoint_dir) else { return false };
    phases.flatten().any(|phase_entry| phase_entry.path().join(format!("{safe_job}.json")).is_file())
}

/// Drives every schema in `mapping` through a [`SchemaRunner`], checking the
/// job lifecycle's cancellation state between blocks, appending one
/// telemetry record and one `job_metrics` row per schema, and returning the
/// total row count written.
fn run_schemas(
    mapping: &MappingConfig,
    checkpoints: &CheckpointRegistry,
    runner_config: &RunnerConfig,
    job_id: &str,
    telemetry_log: Option<&Utf8PathBuf>,
    lifecycle: Option<&JobLifecycle>,
) -> Result<u64> {
    let mut total_rows = 0u64;
    for schema in &mapping.schemas {
        let contract = None;
        let runner = SchemaRunner::new(schema, mapping, contract, checkpoints, runner_config, None);
        let start = Instant::now();
        let outcome = runner
            .run(
                |progress: JobProgressEvent| render_progress(schema.name.as_str(), &progress),
                || lifecycle.is_some_and(JobLifecycle::is_cancelled),
            )
            .with_context(|| format!("materializing schema '{}'", schema.name))?;
        let duration_seconds = start.elapsed().as_secs_f64();

        println!(
            "[materialize] schema={} blocks={} rows={} rows/s={:.0} files={} short_rows={} long_rows={} spills={} rows_spilled={}{}",
            schema.name,
            outcome.blocks_processed,
            outcome.total_rows,
            outcome.rows_per_second,
            outcome.output_files.len(),
            outcome.validation.short_rows,
            outcome.validation.long_rows,
            outcome.spill_metrics.spills,
            outcome.spill_metrics.rows_spilled,
            if outcome.cancelled { " CANCELLED" } else { "" },
        );

        if let Some(log_path) = telemetry_log {
            append_telemetry_record(log_path, job_id, &schema.name, &outcome, duration_seconds)?;
        }

        if let Some(lifecycle) = lifecycle {
            lifecycle.record_metrics(&JobMetrics {
                schema_id: outcome.schema_id,
                rows_written: outcome.total_rows,
                duration_seconds,
                rows_per_second: outcome.rows_per_second,
                error_count: outcome.validation.missing_required + outcome.validation.type_mismatches,
                warnings: validation_warnings(&outcome.validation),
                spill_count: outcome.spill_metrics.spills,
                rows_spilled: outcome.spill_metrics.rows_spilled,
                created_at: Utc::now(),
            })?;
        }

        total_rows += outcome.total_rows;
    }
    Ok(total_rows)
}

fn validation_warnings(validation: &schemaforge_types::ValidationSummary) -> Vec<String> {
    let mut warnings = Vec::new();
    if validation.short_rows > 0 {
        warnings.push(format!("{} short row(s) padded", validation.short_rows));
    }
    if validation.long_rows > 0 {
        warnings.push(format!("{} long row(s) truncated", validation.long_rows));
    }
    if validation.empty_rows > 0 {
        warnings.push(format!("{} empty row(s)", validation.empty_rows));
    }
    warnings
}

/// Appends one JSONL telemetry record per materialized schema: throughput
/// and spill counters, grounded on `benchmark`'s JSONL-append pattern.
fn append_telemetry_record(
    log_path: &Utf8PathBuf,
    job_id: &str,
    schema_name: &str,
    outcome: &MaterializationOutcome,
    duration_seconds: f64,
) -> Result<()> {
    let record = serde_json::json!({
        "job_id": job_id,
        "schema": schema_name,
        "rows_written": outcome.total_rows,
        "rows_per_second": outcome.rows_per_second,
        "duration_seconds": duration_seconds,
        "spills": outcome.spill_metrics.spills,
        "rows_spilled": outcome.spill_metrics.rows_spilled,
        "bytes_spilled": outcome.spill_metrics.bytes_spilled,
        "cancelled": outcome.cancelled,
        "recorded_at": Utc::now().to_rfc3339(),
    });
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening telemetry log {log_path}"))?;
    writeln!(file, "{record}").context("appending telemetry record")
}

fn render_progress(schema_name: &str, progress: &JobProgressEvent) {
    let total = progress.total_rows.map_or("?".to_string(), |t| t.to_string());
    let eta = progress.eta_seconds.map_or(String::new(), |s| format!(" eta={s:.1}s"));
    println!("[materialize/progress] {schema_name} rows={}/{total}{eta}", progress.processed_rows);
}

fn maybe_persist_sqlite(mapping: &MappingConfig, sqlite_db: Option<&Utf8PathBuf>) -> Result<()> {
    let Some(_db_path) = sqlite_db else { return Ok(()) };
    #[cfg(feature = "sqlite")]
    {
        schemaforge_storage::SqliteMappingStore::new(_db_path.clone())
            .with_context(|| format!("opening sqlite db {_db_path}"))?
            .save(mapping)
            .with_context(|| format!("persisting mapping to sqlite db {_db_path}"))?;
    }
    #[cfg(not(feature = "sqlite"))]
    {
        let _ = mapping;
        tracing::warn!("--sqlite-db given but this build lacks the `sqlite` feature; skipping");
    }
    Ok(())
}

pub fn dispatch(command: Commands, config_path: Option<Utf8PathBuf>, profile: Option<String>) -> Result<()> {
    match command {
        Commands::Analyze { inputs, output, sqlite_db, job_id } => analyze(&inputs, &output, sqlite_db.as_ref(), config_path, profile, job_id),
        Commands::Benchmark { inputs, log } => benchmark(&inputs, log.as_ref(), config_path, profile),
        Commands::Review { mapping, output, sqlite_db, job_id } => review(&mapping, &output, sqlite_db.as_ref(), job_id),
        Commands::Normalize { mapping, output, sqlite_db } => normalize(&mapping, &output, sqlite_db.as_ref()),
        Commands::Materialize {
            mapping,
            dest,
            plan,
            checkpoint_dir,
            writer_format,
            spill_threshold,
            telemetry_log,
            db_url,
            sqlite_db,
            job_id,
            resume,
        } => materialize(
            &mapping,
            &dest,
            &plan,
            &checkpoint_dir,
            writer_format,
            spill_threshold,
            telemetry_log.as_ref(),
            db_url.as_deref(),
            sqlite_db.as_ref(),
            job_id,
            resume,
            config_path,
            profile,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_any_checkpoint_finds_a_file_nested_under_a_phase_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        std::fs::create_dir_all(root.join("materialize")).unwrap();
        std::fs::write(root.join("materialize").join("job-1.json"), "{}").unwrap();
        assert!(has_any_checkpoint(&root, "job-1"));
        assert!(!has_any_checkpoint(&root, "job-2"));
    }

    #[test]
    fn has_any_checkpoint_is_false_for_a_missing_directory() {
        let root = Utf8PathBuf::from("/nonexistent/schemaforge-checkpoint-dir");
        assert!(!has_any_checkpoint(&root, "job-1"));
    }
}
