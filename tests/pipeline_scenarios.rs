//! End-to-end scenarios driving the analyze -> review -> normalize ->
//! materialize pipeline directly through the library crates (white-box:
//! bypasses the CLI's argument parsing and uses the same calls
//! `src/cli/commands.rs` makes).

use std::collections::HashMap;
use std::io::Write;

use camino::Utf8PathBuf;
use schemaforge_materialize::{RunnerConfig, SchemaRunner, WriterFormat};
use schemaforge_sampling::{AnalysisEngine, AnalysisSettings};
use schemaforge_types::MappingConfig;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

fn settings() -> AnalysisSettings {
    AnalysisSettings {
        encoding: "utf-8".to_string(),
        block_size: 1_000,
        min_gap_lines: 10,
        sample_values_cap: 50,
        max_parallel_files: 2,
    }
}

async fn analyze_and_build_mapping(files: &[Utf8PathBuf]) -> MappingConfig {
    let engine = AnalysisEngine::new(settings());
    let results = engine.analyze_files(files).await;

    let mut mapping = MappingConfig::new();
    let mut blocks = Vec::new();
    for (path, result) in results {
        let result = result.unwrap_or_else(|err| panic!("analysis failed for {path}: {err}"));
        blocks.extend(result.blocks.iter().cloned());
        if let Some(first) = result.blocks.first() {
            let header_line = std::fs::read_to_string(&result.file_path).unwrap();
            let header: Vec<String> = header_line
                .lines()
                .next()
                .unwrap_or_default()
                .split(first.signature.delimiter)
                .map(|s| s.trim().to_string())
                .collect();
            mapping.file_headers.insert(result.file_path.clone(), header);
        }
    }
    let schemas = schemaforge_cluster::bootstrap_schemas(&mut blocks, &mapping.file_headers);
    mapping.blocks = blocks;
    mapping.schemas = schemas;
    mapping
}

fn review(mapping: &mut MappingConfig) {
    let results: Vec<_> = {
        let mut by_file: HashMap<Utf8PathBuf, Vec<schemaforge_types::FileBlock>> = HashMap::new();
        for block in &mapping.blocks {
            by_file.entry(block.file_path.clone()).or_default().push(block.clone());
        }
        by_file
            .into_iter()
            .map(|(file_path, blocks)| {
                let total_lines = blocks.iter().map(|b| b.end_line + 1).max().unwrap_or(0);
                schemaforge_sampling::FileAnalysisResult { file_path, total_lines, blocks }
            })
            .collect()
    };
    let clusters = schemaforge_cluster::build(&results, &mapping.file_headers);
    mapping.schema_mapping = schemaforge_offsets::resolve_offsets(&clusters, &mapping.column_profiles);
    mapping.header_clusters = clusters;
}

fn materialize(mapping: &MappingConfig, dir: &tempfile::TempDir, job_id: &str) -> Vec<schemaforge_materialize::runner::MaterializationOutcome> {
    let dest = Utf8PathBuf::from_path_buf(dir.path().join("out")).unwrap();
    let scratch = Utf8PathBuf::from_path_buf(dir.path().join("scratch")).unwrap();
    let checkpoint_dir = Utf8PathBuf::from_path_buf(dir.path().join("checkpoints")).unwrap();
    let checkpoints = schemaforge_checkpoint::CheckpointRegistry::new(checkpoint_dir);

    mapping
        .schemas
        .iter()
        .map(|schema| {
            let config = RunnerConfig {
                job_id: job_id.to_string(),
                dest_dir: dest.clone(),
                scratch_dir: scratch.clone(),
                writer_format: WriterFormat::Csv,
                chunk_rows: 1_000,
                spill_threshold: 1_000,
                progress_granularity: 100,
            };
            let runner = SchemaRunner::new(schema, mapping, None, &checkpoints, &config, None);
            runner.run(|_| {}, || false).expect("materialization should succeed")
        })
        .collect()
}

/// Scenario 1 from the intake spec: a single well-formed three-column file
/// round-trips through the whole pipeline with every row preserved.
#[tokio::test]
async fn stable_three_column_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "people.csv", "name,age,city\nAda,30,London\nGrace,40,NYC\n");

    let mut mapping = analyze_and_build_mapping(&[path]).await;
    assert_eq!(mapping.schemas.len(), 1, "one file, one schema");
    assert!(mapping.blocks.iter().all(|b| b.schema_id.is_some()), "every block got a schema_id");

    review(&mut mapping);
    let outcomes = materialize(&mapping, &dir, "job-stable");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].total_rows, 2);
}

/// Scenario 2: the same three columns in a different order across two
/// files must land in the same canonical schema with offsets resolved.
#[tokio::test]
async fn swapped_columns_across_two_files_share_one_schema() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(&dir, "a.csv", "name,age,city\nAda,30,London\n");
    let b = write_file(&dir, "b.csv", "city,name,age\nNYC,Grace,40\n");

    let mut mapping = analyze_and_build_mapping(&[a, b]).await;
    review(&mut mapping);

    let outcomes = materialize(&mapping, &dir, "job-swapped");
    let total_rows: u64 = outcomes.iter().map(|o| o.total_rows).sum();
    assert_eq!(total_rows, 2, "both files' rows must appear in the materialized output");
}

/// Boundary case: an empty file (header only, no data rows) produces a
/// schema with zero materialized rows rather than failing the run.
#[tokio::test]
async fn header_only_file_materializes_with_zero_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "empty.csv", "name,age,city\n");

    let mut mapping = analyze_and_build_mapping(&[path]).await;
    review(&mut mapping);
    let outcomes = materialize(&mapping, &dir, "job-empty");

    assert_eq!(outcomes.iter().map(|o| o.total_rows).sum::<u64>(), 0);
}
