//! The default `MappingConfig` persistence: one pretty-printed JSON file.

use camino::Utf8PathBuf;
use schemaforge_types::{MappingConfig, SchemaforgeError};

use crate::MappingStore;

pub struct JsonMappingStore {
    path: Utf8PathBuf,
}

impl JsonMappingStore {
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

impl MappingStore for JsonMappingStore {
    fn save(&self, mapping: &MappingConfig) -> Result<(), SchemaforgeError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SchemaforgeError::Io {
                path: parent.to_string(),
                source,
            })?;
        }
        let body = serde_json::to_vec_pretty(mapping).map_err(|source| SchemaforgeError::Io {
            path: self.path.to_string(),
            source: std::io::Error::other(source),
        })?;
        std::fs::write(&self.path, body).map_err(|source| SchemaforgeError::Io {
            path: self.path.to_string(),
            source,
        })
    }

    fn load(&self) -> Result<MappingConfig, SchemaforgeError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| SchemaforgeError::Io {
            path: self.path.to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SchemaforgeError::Io {
            path: self.path.to_string(),
            source: std::io::Error::other(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_empty_mapping_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8Path::from_path(dir.path()).unwrap().join("mapping.json");
        let store = JsonMappingStore::new(path);
        let mapping = MappingConfig::new();
        store.save(&mapping).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.version, mapping.version);
        assert!(loaded.blocks.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8Path::from_path(dir.path()).unwrap().join("absent.json");
        let store = JsonMappingStore::new(path);
        assert!(store.load().is_err());
    }
}
