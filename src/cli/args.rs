//! CLI argument definitions: the top-level [`Cli`] struct and the five
//! subcommands, grounded on the teacher's `cli/args.rs` split between
//! global flags and per-subcommand `Args`.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Resource-aware CSV/TSV analysis, clustering, and materialization tool.
#[derive(Parser, Debug)]
#[command(name = "schemaforge")]
#[command(about = "Infers, clusters, and materializes unified schemas from heterogeneous tabular files")]
#[command(version)]
pub struct Cli {
    /// Path to `schemaforge.json` (overrides upward discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Tuning profile selected from the config document's `profiles` table
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample and profile input files, emitting a mapping config
    Analyze {
        /// Files or directories to process
        inputs: Vec<Utf8PathBuf>,

        /// Path to write the mapping configuration JSON
        #[arg(long, default_value = "mapping.json")]
        output: Utf8PathBuf,

        /// Optional SQLite file to persist the mapping + audit log
        #[arg(long)]
        sqlite_db: Option<Utf8PathBuf>,

        /// Job identifier the lifecycle state machine is registered under;
        /// a fresh UUID is generated and printed when omitted
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Measure analysis throughput without writing a mapping artifact
    Benchmark {
        /// Files or directories to process
        inputs: Vec<Utf8PathBuf>,

        /// Path to append a JSONL benchmark record to
        #[arg(long)]
        log: Option<Utf8PathBuf>,
    },

    /// Cluster header variants across an existing mapping's blocks
    Review {
        /// Path to the mapping configuration JSON to read and update
        #[arg(long, default_value = "mapping.json")]
        mapping: Utf8PathBuf,

        /// Path to write the updated mapping configuration JSON
        #[arg(long, default_value = "mapping.json")]
        output: Utf8PathBuf,

        /// Optional SQLite file to persist the mapping + audit log
        #[arg(long)]
        sqlite_db: Option<Utf8PathBuf>,

        /// Job identifier this review belongs to; must match the `analyze`
        /// step's job for the state machine transition to apply
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Re-derive schema column names from the synonym dictionary
    Normalize {
        /// Path to the mapping configuration JSON to read and update
        #[arg(long, default_value = "mapping.json")]
        mapping: Utf8PathBuf,

        /// Path to write the updated mapping configuration JSON
        #[arg(long, default_value = "mapping.json")]
        output: Utf8PathBuf,

        /// Optional SQLite file to persist the mapping + audit log
        #[arg(long)]
        sqlite_db: Option<Utf8PathBuf>,
    },

    /// Materialize every schema in a mapping to chunked output files
    Materialize {
        /// Path to the mapping configuration JSON to read
        #[arg(long, default_value = "mapping.json")]
        mapping: Utf8PathBuf,

        /// Directory to write materialized output files into
        #[arg(long, default_value = "output_data")]
        dest: Utf8PathBuf,

        /// Path to write the materialization plan/summary JSON
        #[arg(long, default_value = "plan.json")]
        plan: Utf8PathBuf,

        /// Directory the checkpoint registry stores resume state in
        #[arg(long, default_value = ".schemaforge/checkpoints")]
        checkpoint_dir: Utf8PathBuf,

        /// Output writer backend
        #[arg(long, value_enum, default_value = "csv")]
        writer_format: WriterFormatArg,

        /// Row count a spill buffer accumulates before spooling to disk
        #[arg(long, default_value_t = 50_000)]
        spill_threshold: usize,

        /// Optional path to append a JSONL progress-telemetry log
        #[arg(long)]
        telemetry_log: Option<Utf8PathBuf>,

        /// `sqlite:///`-prefixed database URL; required when `--writer-format=database`
        #[arg(long)]
        db_url: Option<String>,

        /// Optional SQLite file to persist job status/progress history
        #[arg(long)]
        sqlite_db: Option<Utf8PathBuf>,

        /// Job identifier; a fresh UUID is generated when omitted
        #[arg(long)]
        job_id: Option<String>,

        /// Resume a previously interrupted job by ID (same as `--job-id`,
        /// but fails if the job's checkpoints directory has nothing to
        /// resume from)
        #[arg(long)]
        resume: Option<String>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterFormatArg {
    Csv,
    Parquet,
    Database,
}
