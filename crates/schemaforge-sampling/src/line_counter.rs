//! C1: chunked line counting with bounded memory usage.

use std::io::Read;

use camino::Utf8Path;
use schemaforge_types::SchemaforgeError;

const DEFAULT_CHUNK_SIZE: usize = 1_048_576;

/// Counts newline-delimited rows without materializing the whole file.
#[derive(Debug, Clone, Copy)]
pub struct LineCounter {
    chunk_size: usize,
}

impl LineCounter {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1024),
        }
    }

    /// Reads `path` in fixed-size chunks and returns its newline-delimited
    /// row count, counting a final non-empty line with no trailing `\n`.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] on any read failure; no partial
    /// count is surfaced.
    pub fn count(&self, path: &Utf8Path) -> Result<u64, SchemaforgeError> {
        let mut file = std::fs::File::open(path).map_err(|source| SchemaforgeError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut line_count: u64 = 0;
        let mut has_data = false;
        let mut last_byte: Option<u8> = None;

        loop {
            let read = file.read(&mut buf).map_err(|source| SchemaforgeError::Io {
                path: path.to_string(),
                source,
            })?;
            if read == 0 {
                break;
            }
            has_data = true;
            line_count += bytecount_newlines(&buf[..read]);
            last_byte = Some(buf[read - 1]);
        }

        if has_data && last_byte != Some(b'\n') {
            line_count += 1;
        }
        Ok(line_count)
    }
}

impl Default for LineCounter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

fn bytecount_newlines(chunk: &[u8]) -> u64 {
    chunk.iter().filter(|&&b| b == b'\n').count() as u64
}
