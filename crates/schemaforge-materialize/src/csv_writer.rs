//! Delimited-text writer backend. Output is always UTF-8 regardless of the
//! source files' detected encoding.

use camino::Utf8Path;
use schemaforge_types::SchemaforgeError;

use crate::writer::WriterBackend;

pub struct CsvBackend {
    header: Vec<String>,
    writer: Option<csv::Writer<std::fs::File>>,
}

impl CsvBackend {
    #[must_use]
    pub fn new(header: Vec<String>) -> Self {
        Self { header, writer: None }
    }

    fn io_error(path: &Utf8Path, error: csv::Error) -> SchemaforgeError {
        SchemaforgeError::Io {
            path: path.to_string(),
            source: error.into_io_error().unwrap_or_else(|| std::io::Error::other(path.to_string())),
        }
    }
}

impl WriterBackend for CsvBackend {
    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn open_stream(&mut self, path: &Utf8Path, append: bool) -> Result<(), SchemaforgeError> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(append)
            .write(true)
            .truncate(!append)
            .open(path)
            .map_err(|source| SchemaforgeError::Io {
                path: path.to_string(),
                source,
            })?;
        self.writer = Some(csv::WriterBuilder::new().from_writer(file));
        Ok(())
    }

    fn after_open(&mut self, append: bool, _rows_already_in_chunk: u64) -> Result<(), SchemaforgeError> {
        if !append {
            let header = self.header.clone();
            let writer = self.writer.as_mut().expect("csv writer opened");
            writer.write_record(&header).map_err(|e| Self::io_error(Utf8Path::new("<header>"), e))?;
        }
        Ok(())
    }

    fn write_row(&mut self, values: &[String]) -> Result<(), SchemaforgeError> {
        let writer = self.writer.as_mut().expect("csv writer opened before write");
        writer.write_record(values).map_err(|e| Self::io_error(Utf8Path::new("<row>"), e))
    }

    fn before_close(&mut self) -> Result<(), SchemaforgeError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|source| SchemaforgeError::Io {
                path: "<csv-flush>".to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{ChunkedWriter, SchemaWriter};

    #[test]
    fn writes_header_once_and_rows_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let dest = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let backend = CsvBackend::new(vec!["city".to_string(), "age".to_string()]);
        let mut writer = ChunkedWriter::new(backend, dest.clone(), "people".to_string(), 2, 2, None, None).unwrap();
        writer.write(&["Kyiv".to_string(), "30".to_string()]).unwrap();
        writer.write(&["Lviv".to_string(), "25".to_string()]).unwrap();
        writer.write(&["Odesa".to_string(), "40".to_string()]).unwrap();
        writer.close().unwrap();

        let first_chunk = std::fs::read_to_string(dest.join("people_000.csv")).unwrap();
        assert!(first_chunk.starts_with("city,age"));
        assert_eq!(first_chunk.lines().count(), 3);
        assert!(dest.join("people_001.csv").exists());
    }
}
