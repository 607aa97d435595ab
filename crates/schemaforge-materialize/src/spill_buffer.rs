//! C10: a bounded in-memory queue of normalized rows that spills to a
//! scratch file under pressure, then drains straight back into the writer.
//! Spill files live only for the length of one drain cycle; their on-disk
//! form doesn't need fsync but the caller must see every buffered row
//! reach the writer.

use std::io::{BufRead, BufReader, Write};

use camino::Utf8PathBuf;
use schemaforge_types::{NormalizedRow, SchemaforgeError, SpillMetrics};
use uuid::Uuid;

use crate::writer::SchemaWriter;

pub struct SpillBuffer {
    buffer: Vec<NormalizedRow>,
    threshold: usize,
    scratch_dir: Utf8PathBuf,
    metrics: SpillMetrics,
}

impl SpillBuffer {
    #[must_use]
    pub fn new(threshold: usize, scratch_dir: Utf8PathBuf) -> Self {
        Self {
            buffer: Vec::with_capacity(threshold.max(1)),
            threshold: threshold.max(1),
            scratch_dir,
            metrics: SpillMetrics::default(),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &SpillMetrics {
        &self.metrics
    }

    /// Pushes a row into the buffer, spilling to disk and draining through
    /// `writer` if the buffer is now full.
    ///
    /// # Errors
    /// Propagates any [`SchemaforgeError`] raised while spilling or writing.
    pub fn push(&mut self, row: NormalizedRow, writer: &mut dyn SchemaWriter) -> Result<(), SchemaforgeError> {
        self.buffer.push(row);
        self.metrics.max_buffer_rows = self.metrics.max_buffer_rows.max(self.buffer.len());
        if self.buffer.len() >= self.threshold {
            self.spill_and_drain(writer)?;
        }
        Ok(())
    }

    /// Drains any buffered rows straight to `writer` without spilling.
    ///
    /// # Errors
    /// Propagates any [`SchemaforgeError`] raised by the writer.
    pub fn flush(&mut self, writer: &mut dyn SchemaWriter) -> Result<(), SchemaforgeError> {
        for row in self.buffer.drain(..) {
            writer.write(&row.values)?;
        }
        Ok(())
    }

    /// # Errors
    /// Propagates any [`SchemaforgeError`] raised by the writer.
    pub fn close(&mut self, writer: &mut dyn SchemaWriter) -> Result<(), SchemaforgeError> {
        self.flush(writer)
    }

    fn spill_and_drain(&mut self, writer: &mut dyn SchemaWriter) -> Result<(), SchemaforgeError> {
        let spill_path = self.scratch_dir.join(format!("spill-{}.jsonl", Uuid::new_v4()));
        let bytes_written = self.write_spill_file(&spill_path)?;
        self.metrics.spills += 1;
        self.metrics.rows_spilled += self.buffer.len() as u64;
        self.metrics.bytes_spilled += bytes_written;
        self.buffer.clear();
        self.drain_spill(&spill_path, writer)?;
        std::fs::remove_file(&spill_path).map_err(|source| SchemaforgeError::Io {
            path: spill_path.to_string(),
            source,
        })
    }

    fn write_spill_file(&self, spill_path: &Utf8PathBuf) -> Result<u64, SchemaforgeError> {
        let file = std::fs::File::create(spill_path).map_err(|source| SchemaforgeError::Io {
            path: spill_path.to_string(),
            source,
        })?;
        let mut writer = std::io::BufWriter::new(file);
        let mut bytes_written = 0u64;
        for row in &self.buffer {
            let line = serde_json::to_string(row).map_err(|source| SchemaforgeError::Io {
                path: spill_path.to_string(),
                source: std::io::Error::other(source),
            })?;
            bytes_written += line.len() as u64 + 1;
            writeln!(writer, "{line}").map_err(|source| SchemaforgeError::Io {
                path: spill_path.to_string(),
                source,
            })?;
        }
        writer.flush().map_err(|source| SchemaforgeError::Io {
            path: spill_path.to_string(),
            source,
        })?;
        Ok(bytes_written)
    }

    fn drain_spill(&self, spill_path: &Utf8PathBuf, writer: &mut dyn SchemaWriter) -> Result<(), SchemaforgeError> {
        let file = std::fs::File::open(spill_path).map_err(|source| SchemaforgeError::Io {
            path: spill_path.to_string(),
            source,
        })?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| SchemaforgeError::Io {
                path: spill_path.to_string(),
                source,
            })?;
            let row: NormalizedRow = serde_json::from_str(&line).map_err(|source| SchemaforgeError::Io {
                path: spill_path.to_string(),
                source: std::io::Error::other(source),
            })?;
            writer.write(&row.values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_types::ValidationSummary;

    struct RecordingWriter {
        rows: Vec<Vec<String>>,
    }

    impl SchemaWriter for RecordingWriter {
        fn write(&mut self, values: &[String]) -> Result<(), SchemaforgeError> {
            self.rows.push(values.to_vec());
            Ok(())
        }
        fn snapshot(&self, _next_block: usize) -> crate::writer::WriterSnapshot {
            crate::writer::WriterSnapshot::default()
        }
        fn close(&mut self) -> Result<(), SchemaforgeError> {
            Ok(())
        }
        fn validation_summary(&self) -> ValidationSummary {
            ValidationSummary::default()
        }
        fn output_files(&self) -> &[String] {
            &[]
        }
        fn total_rows(&self) -> u64 {
            self.rows.len() as u64
        }
    }

    #[test]
    fn spills_once_threshold_reached_and_drains_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut buffer = SpillBuffer::new(2, scratch);
        let mut writer = RecordingWriter { rows: Vec::new() };

        buffer.push(NormalizedRow::new(vec!["a".into()], 1), &mut writer).unwrap();
        buffer.push(NormalizedRow::new(vec!["b".into()], 1), &mut writer).unwrap();
        buffer.push(NormalizedRow::new(vec!["c".into()], 1), &mut writer).unwrap();
        buffer.close(&mut writer).unwrap();

        assert_eq!(writer.rows.len(), 3);
        assert_eq!(buffer.metrics().spills, 1);
        assert_eq!(buffer.metrics().rows_spilled, 2);
        assert_eq!(buffer.metrics().max_buffer_rows, 2);
    }

    #[test]
    fn flush_drains_without_spilling() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut buffer = SpillBuffer::new(10, scratch);
        let mut writer = RecordingWriter { rows: Vec::new() };

        buffer.push(NormalizedRow::new(vec!["x".into()], 1), &mut writer).unwrap();
        buffer.flush(&mut writer).unwrap();

        assert_eq!(writer.rows.len(), 1);
        assert_eq!(buffer.metrics().spills, 0);
    }
}
