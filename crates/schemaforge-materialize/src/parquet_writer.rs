//! Columnar writer backend (feature `parquet`). Every output column is
//! written as an optional UTF-8 byte-array field; rows are buffered and
//! flushed as one row group every [`FLUSH_ROWS`] rows, matching the
//! batch-per-N-rows cadence the original pyarrow-backed writer used.

use std::fs::File;
use std::sync::Arc;

use camino::Utf8Path;
use parquet::basic::Compression;
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use parquet::schema::types::TypePtr;
use schemaforge_types::SchemaforgeError;

use crate::writer::{ResumePolicy, WriterBackend};

const FLUSH_ROWS: usize = 2048;

fn build_schema(header: &[String]) -> Result<TypePtr, SchemaforgeError> {
    let fields = header
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("optional byte_array {} (UTF8);", sanitize_field_name(name, idx)))
        .collect::<Vec<_>>()
        .join(" ");
    let message = format!("message schema {{ {fields} }}");
    parse_message_type(&message).map(Arc::new).map_err(|source| SchemaforgeError::Config {
        path: "<parquet-schema>".to_string(),
        reason: source.to_string(),
    })
}

fn sanitize_field_name(name: &str, idx: usize) -> String {
    let cleaned: String = name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
    if cleaned.is_empty() { format!("column_{idx}") } else { cleaned }
}

pub struct ParquetBackend {
    header: Vec<String>,
    schema: TypePtr,
    file_writer: Option<SerializedFileWriter<File>>,
    buffer: Vec<Vec<String>>,
}

impl ParquetBackend {
    /// # Errors
    /// Returns [`SchemaforgeError::Config`] if the header cannot be turned
    /// into a valid parquet message schema.
    pub fn new(header: Vec<String>) -> Result<Self, SchemaforgeError> {
        let schema = build_schema(&header)?;
        Ok(Self {
            header,
            schema,
            file_writer: None,
            buffer: Vec::new(),
        })
    }

    fn flush_buffer(&mut self) -> Result<(), SchemaforgeError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let file_writer = self.file_writer.as_mut().expect("parquet file opened before flush");
        let mut row_group_writer = file_writer.next_row_group().map_err(Self::parquet_error)?;
        let mut column_index = 0;
        while let Some(mut column_writer) = row_group_writer.next_column().map_err(Self::parquet_error)? {
            let values: Vec<ByteArray> = self
                .buffer
                .iter()
                .map(|row| ByteArray::from(row.get(column_index).map(String::as_str).unwrap_or("").as_bytes().to_vec()))
                .collect();
            let definition_levels: Vec<i16> = vec![1; values.len()];
            match column_writer.untyped() {
                ColumnWriter::ByteArrayColumnWriter(ref mut typed) => {
                    typed.write_batch(&values, Some(&definition_levels), None).map_err(Self::parquet_error)?;
                }
                _ => unreachable!("schema declares every column as byte_array"),
            }
            column_writer.close().map_err(Self::parquet_error)?;
            column_index += 1;
        }
        row_group_writer.close().map_err(Self::parquet_error)?;
        self.buffer.clear();
        Ok(())
    }

    fn parquet_error(error: parquet::errors::ParquetError) -> SchemaforgeError {
        SchemaforgeError::Io {
            path: "<parquet>".to_string(),
            source: std::io::Error::other(error.to_string()),
        }
    }
}

impl WriterBackend for ParquetBackend {
    fn file_extension(&self) -> &'static str {
        "parquet"
    }

    fn resume_policy(&self) -> ResumePolicy {
        ResumePolicy::StartFreshChunk
    }

    fn open_stream(&mut self, path: &Utf8Path, _append: bool) -> Result<(), SchemaforgeError> {
        let file = File::create(path).map_err(|source| SchemaforgeError::Io {
            path: path.to_string(),
            source,
        })?;
        let props = Arc::new(WriterProperties::builder().set_compression(Compression::SNAPPY).build());
        let writer = SerializedFileWriter::new(file, self.schema.clone(), props).map_err(Self::parquet_error)?;
        self.file_writer = Some(writer);
        self.buffer.clear();
        Ok(())
    }

    fn after_open(&mut self, _append: bool, _rows_already_in_chunk: u64) -> Result<(), SchemaforgeError> {
        let _ = &self.header;
        Ok(())
    }

    fn write_row(&mut self, values: &[String]) -> Result<(), SchemaforgeError> {
        self.buffer.push(values.to_vec());
        if self.buffer.len() >= FLUSH_ROWS {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn before_close(&mut self) -> Result<(), SchemaforgeError> {
        self.flush_buffer()?;
        if let Some(writer) = self.file_writer.take() {
            writer.close().map_err(Self::parquet_error)?;
        }
        Ok(())
    }
}
