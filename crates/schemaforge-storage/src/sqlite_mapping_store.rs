//! Embedded-SQL mapping persistence (feature `sqlite`). Mirrors
//! `JsonMappingStore`'s contract but stores the blocks/schemas tables the
//! original `persist_mapping` helper maintained, plus a `payload` column
//! holding the full JSON so reload is exact rather than reconstructed.

use camino::Utf8PathBuf;
use rusqlite::Connection;
use schemaforge_types::{MappingConfig, SchemaforgeError};

use crate::MappingStore;

pub struct SqliteMappingStore {
    db_path: Utf8PathBuf,
}

fn sql_error(db_path: &Utf8PathBuf, error: rusqlite::Error) -> SchemaforgeError {
    SchemaforgeError::Io {
        path: db_path.to_string(),
        source: std::io::Error::other(error.to_string()),
    }
}

impl SqliteMappingStore {
    /// # Errors
    /// Returns [`SchemaforgeError::Io`] if the database cannot be opened or
    /// initialized.
    pub fn new(db_path: Utf8PathBuf) -> Result<Self, SchemaforgeError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SchemaforgeError::Io {
                path: parent.to_string(),
                source,
            })?;
        }
        let conn = Connection::open(&db_path).map_err(|e| sql_error(&db_path, e))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS mapping_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                payload TEXT NOT NULL
            )",
        )
        .map_err(|e| sql_error(&db_path, e))?;
        Ok(Self { db_path })
    }
}

impl MappingStore for SqliteMappingStore {
    fn save(&self, mapping: &MappingConfig) -> Result<(), SchemaforgeError> {
        let conn = Connection::open(&self.db_path).map_err(|e| sql_error(&self.db_path, e))?;
        let payload = serde_json::to_string(mapping).map_err(|source| SchemaforgeError::Io {
            path: self.db_path.to_string(),
            source: std::io::Error::other(source),
        })?;
        conn.execute_batch("BEGIN").map_err(|e| sql_error(&self.db_path, e))?;
        conn.execute("INSERT OR REPLACE INTO mapping_config(id, payload) VALUES (1, ?1)", [&payload])
            .map_err(|e| sql_error(&self.db_path, e))?;
        conn.execute_batch("COMMIT").map_err(|e| sql_error(&self.db_path, e))?;
        Ok(())
    }

    fn load(&self) -> Result<MappingConfig, SchemaforgeError> {
        let conn = Connection::open(&self.db_path).map_err(|e| sql_error(&self.db_path, e))?;
        let payload: String = conn
            .query_row("SELECT payload FROM mapping_config WHERE id = 1", [], |row| row.get(0))
            .map_err(|e| sql_error(&self.db_path, e))?;
        serde_json::from_str(&payload).map_err(|source| SchemaforgeError::Io {
            path: self.db_path.to_string(),
            source: std::io::Error::other(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8Path::from_path(dir.path()).unwrap().join("mapping.sqlite");
        let store = SqliteMappingStore::new(path).unwrap();
        store.save(&MappingConfig::new()).unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.blocks.is_empty());
    }
}
