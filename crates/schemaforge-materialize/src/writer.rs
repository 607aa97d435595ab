//! C11: the chunked writer contract. [`WriterBackend`] is the
//! format-specific seam (CSV/Parquet/database); [`ChunkedWriter`] owns the
//! shared chunk-rolling, validation, and resumption logic every format
//! shares, and is exposed to callers behind the object-safe [`SchemaWriter`]
//! trait so the runner can hold one of several formats behind a `Box`.

use camino::{Utf8Path, Utf8PathBuf};
use schemaforge_types::{CanonicalSchema, SchemaforgeError, ValidationSummary};
use serde::{Deserialize, Serialize};

use schemaforge_normalize::ValidationTracker;

/// Whether a writer format can append to its current chunk after a resume,
/// or must always start a fresh one (Parquet's file footer makes append
/// impossible once a file has been closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    AppendCurrentChunk,
    StartFreshChunk,
}

/// Durable writer state, round-tripped through the checkpoint registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriterSnapshot {
    pub next_block: usize,
    pub chunk_index: u64,
    pub rows_in_chunk: u64,
    pub total_rows: u64,
    pub output_files: Vec<String>,
}

/// The format-specific seam a [`ChunkedWriter`] delegates to.
pub trait WriterBackend {
    fn file_extension(&self) -> &'static str;
    fn resume_policy(&self) -> ResumePolicy {
        ResumePolicy::AppendCurrentChunk
    }
    fn open_stream(&mut self, path: &Utf8Path, append: bool) -> Result<(), SchemaforgeError>;
    /// `rows_already_in_chunk` is `0` for a fresh chunk and the resumed row
    /// count when reopening a chunk to append to (so a backend that tracks
    /// its own per-row sequence number, like the database backend, can
    /// continue it instead of restarting from zero and colliding with rows
    /// already written this chunk).
    fn after_open(&mut self, append: bool, rows_already_in_chunk: u64) -> Result<(), SchemaforgeError>;
    fn write_row(&mut self, values: &[String]) -> Result<(), SchemaforgeError>;
    fn before_close(&mut self) -> Result<(), SchemaforgeError>;
}

/// The object-safe surface the materialization runner drives, regardless of
/// backing format.
pub trait SchemaWriter {
    fn write(&mut self, values: &[String]) -> Result<(), SchemaforgeError>;
    fn snapshot(&self, next_block: usize) -> WriterSnapshot;
    fn close(&mut self) -> Result<(), SchemaforgeError>;
    fn validation_summary(&self) -> ValidationSummary;
    fn output_files(&self) -> &[String];
    fn total_rows(&self) -> u64;
}

/// Shared chunk/resume/validation logic, generic over the format-specific
/// [`WriterBackend`].
pub struct ChunkedWriter<B: WriterBackend> {
    backend: B,
    dest_dir: Utf8PathBuf,
    slug: String,
    chunk_rows: u64,
    chunk_index: u64,
    rows_in_chunk: u64,
    total_rows: u64,
    output_files: Vec<String>,
    validation: ValidationTracker,
}

impl<B: WriterBackend> ChunkedWriter<B> {
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the initial chunk cannot be opened.
    pub fn new(
        backend: B,
        dest_dir: Utf8PathBuf,
        slug: String,
        header_len: usize,
        chunk_rows: u64,
        contract: Option<CanonicalSchema>,
        resume: Option<WriterSnapshot>,
    ) -> Result<Self, SchemaforgeError> {
        let resume = resume.map(|mut snapshot| {
            if snapshot.rows_in_chunk > 0 && backend.resume_policy() == ResumePolicy::StartFreshChunk {
                snapshot.chunk_index += 1;
                snapshot.rows_in_chunk = 0;
            }
            snapshot
        });
        let (chunk_index, rows_in_chunk, total_rows, output_files) = match resume {
            Some(s) => (s.chunk_index, s.rows_in_chunk, s.total_rows, s.output_files),
            None => (0, 0, 0, Vec::new()),
        };

        let mut writer = Self {
            backend,
            dest_dir,
            slug,
            chunk_rows: chunk_rows.max(1),
            chunk_index,
            rows_in_chunk,
            total_rows,
            output_files,
            validation: ValidationTracker::new(header_len.max(1), contract),
        };
        if writer.rows_in_chunk > 0 {
            writer.open_current(true)?;
        } else {
            writer.start_new_chunk()?;
        }
        Ok(writer)
    }

    fn path_for_chunk(&self, chunk_index: u64) -> Utf8PathBuf {
        self.dest_dir.join(format!("{}_{chunk_index:03}.{}", self.slug, self.backend.file_extension()))
    }

    fn record_output_path(&mut self, path: &Utf8Path) {
        let path = path.to_string();
        if !self.output_files.contains(&path) {
            self.output_files.push(path);
        }
    }

    fn ensure_dest_dir(&self) -> Result<(), SchemaforgeError> {
        std::fs::create_dir_all(&self.dest_dir).map_err(|source| SchemaforgeError::Io {
            path: self.dest_dir.to_string(),
            source,
        })
    }

    fn start_new_chunk(&mut self) -> Result<(), SchemaforgeError> {
        self.backend.before_close()?;
        self.ensure_dest_dir()?;
        let path = self.path_for_chunk(self.chunk_index);
        self.backend.open_stream(&path, false)?;
        self.backend.after_open(false, 0)?;
        self.record_output_path(&path);
        self.rows_in_chunk = 0;
        Ok(())
    }

    fn open_current(&mut self, append: bool) -> Result<(), SchemaforgeError> {
        self.ensure_dest_dir()?;
        let path = self.path_for_chunk(self.chunk_index);
        self.backend.open_stream(&path, append)?;
        self.backend.after_open(append, self.rows_in_chunk)?;
        self.record_output_path(&path);
        Ok(())
    }
}

impl<B: WriterBackend> SchemaWriter for ChunkedWriter<B> {
    fn write(&mut self, values: &[String]) -> Result<(), SchemaforgeError> {
        let normalized = self.validation.normalize(values);
        if self.rows_in_chunk >= self.chunk_rows {
            self.chunk_index += 1;
            self.start_new_chunk()?;
        }
        self.backend.write_row(&normalized)?;
        self.rows_in_chunk += 1;
        self.total_rows += 1;
        Ok(())
    }

    fn snapshot(&self, next_block: usize) -> WriterSnapshot {
        WriterSnapshot {
            next_block,
            chunk_index: self.chunk_index,
            rows_in_chunk: self.rows_in_chunk,
            total_rows: self.total_rows,
            output_files: self.output_files.clone(),
        }
    }

    fn close(&mut self) -> Result<(), SchemaforgeError> {
        self.backend.before_close()
    }

    fn validation_summary(&self) -> ValidationSummary {
        self.validation.summary()
    }

    fn output_files(&self) -> &[String] {
        &self.output_files
    }

    fn total_rows(&self) -> u64 {
        self.total_rows
    }
}
