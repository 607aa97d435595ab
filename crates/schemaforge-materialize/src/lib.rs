//! Chunked, resumable schema materialization: C10 (spill buffer), C11
//! (chunked writer across formats), and C15 (the per-schema runner that
//! drives them).

pub mod csv_writer;
#[cfg(feature = "sqlite")]
pub mod database_writer;
#[cfg(feature = "parquet")]
pub mod parquet_writer;
pub mod runner;
pub mod spill_buffer;
pub mod writer;

pub use csv_writer::CsvBackend;
#[cfg(feature = "sqlite")]
pub use database_writer::DatabaseBackend;
#[cfg(feature = "parquet")]
pub use parquet_writer::ParquetBackend;
pub use runner::{GlobalDedupSet, MaterializationOutcome, RunnerConfig, SchemaRunner, WriterFormat};
pub use spill_buffer::SpillBuffer;
pub use writer::{ChunkedWriter, ResumePolicy, SchemaWriter, WriterBackend, WriterSnapshot};
