//! The mapping artifact: [`MappingConfig`] and its constituents. This is the
//! single persistent document handed between the analysis, clustering,
//! offset-resolution, and materialization stages.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::header::HeaderCluster;
use crate::profile::ColumnProfileResult;
use crate::sampling::FileBlock;

/// The current on-disk version of [`MappingConfig`]. Legacy payloads missing
/// a `version` field upgrade transparently on load (see `schemaforge-storage`).
pub const MAPPING_CONFIG_VERSION: u32 = 1;

/// A data type a canonical column may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Float,
    Decimal,
    Bool,
    Date,
    Datetime,
    Json,
}

/// One column of a [`SchemaDefinition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub index: usize,
    pub raw: String,
    pub normalized: String,
    pub data_type: DataType,
    pub known_variants: Vec<String>,
}

/// A stable, named, ordered column schema derived from clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub id: uuid::Uuid,
    pub name: String,
    pub columns: Vec<SchemaColumn>,
}

/// Per-(file, source_index) realignment instruction produced by the offset
/// resolver (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMappingEntry {
    pub file_path: Utf8PathBuf,
    pub source_index: usize,
    pub canonical_name: String,
    pub target_index: Option<usize>,
    /// `source_index - target_index`; `None` iff zero.
    pub offset_from_index: Option<i64>,
    pub offset_reason: String,
    pub offset_confidence: Option<f64>,
}

/// The single persistent artifact passed between pipeline phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    pub version: u32,
    pub blocks: Vec<FileBlock>,
    pub schemas: Vec<SchemaDefinition>,
    pub header_clusters: Vec<HeaderCluster>,
    pub schema_mapping: Vec<SchemaMappingEntry>,
    pub column_profiles: HashMap<String, Vec<ColumnProfileResult>>,
    pub file_headers: HashMap<Utf8PathBuf, Vec<String>>,
}

impl MappingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: MAPPING_CONFIG_VERSION,
            blocks: Vec::new(),
            schemas: Vec::new(),
            header_clusters: Vec::new(),
            schema_mapping: Vec::new(),
            column_profiles: HashMap::new(),
            file_headers: HashMap::new(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self::new()
    }
}
