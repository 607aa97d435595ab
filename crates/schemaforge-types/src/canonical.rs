//! Optional canonical-contract types: [`CanonicalSchema`] /
//! [`CanonicalColumnSpec`]. These describe the validation contract a schema
//! may opt into; absence of a registry entry means "no contract".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-column validation contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalColumnSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_allow_null")]
    pub allow_null: bool,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
}

fn default_allow_null() -> bool {
    true
}

/// A named, optional validation contract for one schema's columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSchema {
    pub name: String,
    pub columns: Vec<CanonicalColumnSpec>,
}

/// Looks schemas up by name; parsed from either `{"schemas": [...]}` or a
/// bare top-level list.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSchemaRegistry {
    by_name: HashMap<String, CanonicalSchema>,
}

impl CanonicalSchemaRegistry {
    #[must_use]
    pub fn new(schemas: Vec<CanonicalSchema>) -> Self {
        let by_name = schemas.into_iter().map(|s| (s.name.clone(), s)).collect();
        Self { by_name }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CanonicalSchema> {
        self.by_name.get(name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegistryDocument {
    Wrapped { schemas: Vec<CanonicalSchema> },
    Bare(Vec<CanonicalSchema>),
}

impl CanonicalSchemaRegistry {
    /// Parses either document shape the external-interfaces contract allows.
    ///
    /// # Errors
    /// Returns the underlying `serde_json` error on malformed input.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let doc: RegistryDocument = serde_json::from_str(raw)?;
        let schemas = match doc {
            RegistryDocument::Wrapped { schemas } => schemas,
            RegistryDocument::Bare(schemas) => schemas,
        };
        Ok(Self::new(schemas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wrapped_and_bare_documents() {
        let wrapped = r#"{"schemas": [{"name": "customers", "columns": []}]}"#;
        let bare = r#"[{"name": "customers", "columns": []}]"#;
        assert!(CanonicalSchemaRegistry::from_json(wrapped).unwrap().get("customers").is_some());
        assert!(CanonicalSchemaRegistry::from_json(bare).unwrap().get("customers").is_some());
    }
}
