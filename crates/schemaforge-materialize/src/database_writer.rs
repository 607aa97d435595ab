//! Embedded SQL table writer backend (feature `sqlite`). One table per
//! schema slug; each chunk is a transactional batch of inserts tagged with
//! `chunk_index`/`row_in_chunk` columns.

use camino::Utf8Path;
use rusqlite::Connection;
use schemaforge_types::SchemaforgeError;

use crate::writer::WriterBackend;

pub struct DatabaseBackend {
    db_path: camino::Utf8PathBuf,
    table_name: String,
    header: Vec<String>,
    conn: Option<Connection>,
    chunk_index: u64,
    row_in_chunk: i64,
}

fn sql_error(db_path: &Utf8Path, error: rusqlite::Error) -> SchemaforgeError {
    SchemaforgeError::Io {
        path: db_path.to_string(),
        source: std::io::Error::other(error.to_string()),
    }
}

impl DatabaseBackend {
    /// # Errors
    /// Returns [`SchemaforgeError::Config`] if `db_url` is not a local
    /// `sqlite:///...` URL.
    pub fn new(db_url: &str, table_name: String, header: Vec<String>) -> Result<Self, SchemaforgeError> {
        let db_path = resolve_sqlite_path(db_url)?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SchemaforgeError::Io {
                path: parent.to_string(),
                source,
            })?;
        }
        Ok(Self {
            db_path,
            table_name,
            header,
            conn: None,
            chunk_index: 0,
            row_in_chunk: 0,
        })
    }

    fn ensure_table(&self, conn: &Connection) -> Result<(), SchemaforgeError> {
        let columns = self
            .header
            .iter()
            .map(|name| format!("\"{}\" TEXT", name.replace('"', "")))
            .collect::<Vec<_>>()
            .join(", ");
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (chunk_index INTEGER, row_in_chunk INTEGER, {columns})",
            self.table_name
        );
        conn.execute(&ddl, []).map_err(|e| sql_error(&self.db_path, e))?;
        Ok(())
    }
}

impl WriterBackend for DatabaseBackend {
    fn file_extension(&self) -> &'static str {
        "sqlite"
    }

    fn open_stream(&mut self, _path: &Utf8Path, _append: bool) -> Result<(), SchemaforgeError> {
        let conn = Connection::open(&self.db_path).map_err(|e| sql_error(&self.db_path, e))?;
        self.ensure_table(&conn)?;
        conn.execute_batch("BEGIN").map_err(|e| sql_error(&self.db_path, e))?;
        self.conn = Some(conn);
        Ok(())
    }

    fn after_open(&mut self, _append: bool, rows_already_in_chunk: u64) -> Result<(), SchemaforgeError> {
        self.row_in_chunk = rows_already_in_chunk as i64;
        Ok(())
    }

    fn write_row(&mut self, values: &[String]) -> Result<(), SchemaforgeError> {
        let conn = self.conn.as_ref().expect("sqlite connection opened before write");
        let mut columns = vec!["chunk_index".to_string(), "row_in_chunk".to_string()];
        columns.extend(self.header.iter().cloned());
        let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!("INSERT INTO \"{}\" ({}) VALUES ({placeholders})", self.table_name, quoted.join(", "));

        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(columns.len());
        let chunk_index = self.chunk_index as i64;
        params.push(&chunk_index);
        params.push(&self.row_in_chunk);
        for value in values {
            params.push(value);
        }
        conn.execute(&sql, params.as_slice()).map_err(|e| sql_error(&self.db_path, e))?;
        self.row_in_chunk += 1;
        Ok(())
    }

    fn before_close(&mut self) -> Result<(), SchemaforgeError> {
        if let Some(conn) = self.conn.take() {
            conn.execute_batch("COMMIT").map_err(|e| sql_error(&self.db_path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{ChunkedWriter, SchemaWriter, WriterSnapshot};

    fn backend(dir: &camino::Utf8Path) -> DatabaseBackend {
        DatabaseBackend::new(&format!("sqlite:///{}", dir.join("data.sqlite")), "t".to_string(), vec!["a".to_string()]).unwrap()
    }

    #[test]
    fn resuming_mid_chunk_continues_row_in_chunk_instead_of_restarting_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8Path::from_path(dir.path()).unwrap();

        let mut writer = ChunkedWriter::new(backend(root), root.to_owned(), "t".to_string(), 1, 100, None, None).unwrap();
        writer.write(&["1".to_string()]).unwrap();
        writer.write(&["2".to_string()]).unwrap();
        let snapshot = writer.snapshot(1);
        assert_eq!(snapshot.rows_in_chunk, 2);
        writer.close().unwrap();

        let mut resumed = ChunkedWriter::new(backend(root), root.to_owned(), "t".to_string(), 1, 100, None, Some(snapshot)).unwrap();
        resumed.write(&["3".to_string()]).unwrap();
        resumed.close().unwrap();

        let conn = Connection::open(root.join("data.sqlite")).unwrap();
        let mut stmt = conn.prepare("SELECT row_in_chunk FROM \"t\" ORDER BY row_in_chunk").unwrap();
        let rows: Vec<i64> = stmt.query_map([], |row| row.get(0)).unwrap().map(Result::unwrap).collect();
        assert_eq!(rows, vec![0, 1, 2], "row_in_chunk must be contiguous across a resume, not restart at 0");
    }
}

fn resolve_sqlite_path(db_url: &str) -> Result<camino::Utf8PathBuf, SchemaforgeError> {
    const PREFIX: &str = "sqlite:///";
    let Some(raw_path) = db_url.strip_prefix(PREFIX) else {
        return Err(SchemaforgeError::Config {
            path: db_url.to_string(),
            reason: "only sqlite:/// URLs are supported for database writers".to_string(),
        });
    };
    camino::Utf8PathBuf::from_path_buf(std::path::PathBuf::from(raw_path)).map_err(|_| SchemaforgeError::Config {
        path: db_url.to_string(),
        reason: "database path is not valid UTF-8".to_string(),
    })
}
