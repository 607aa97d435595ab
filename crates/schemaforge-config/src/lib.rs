//! Hierarchical configuration with discovery and source attribution.
//!
//! Precedence is CLI > config file > built-in defaults, mirroring the
//! discovery scheme production CLIs in this ecosystem use: walk upward from
//! the working directory looking for a project config file, stopping at a
//! repository root marker so a stray file higher in the tree is never
//! picked up by accident.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use schemaforge_types::SchemaforgeError;
use serde::{Deserialize, Serialize};

/// The file name discovery looks for, from the working directory upward.
pub const CONFIG_FILE_NAME: &str = "schemaforge.json";

/// Decoding strictness for source files. Does not affect output, which is
/// always UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    FailFast,
    Strict,
    Replace,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::FailFast
    }
}

/// Settings shared across every profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub encoding: String,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    pub synonym_dictionary: Option<Utf8PathBuf>,
    pub canonical_schema_path: Option<Utf8PathBuf>,
}

/// Per-job resource ceilings; absent fields are unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory_mb: Option<u64>,
    pub spill_mb: Option<u64>,
    pub max_workers: Option<u32>,
    pub temp_dir: Utf8PathBuf,
}

/// A named tuning profile, selected via `--profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub description: Option<String>,
    pub block_size: u64,
    pub min_gap_lines: u64,
    pub max_parallel_files: u32,
    pub sample_values_cap: usize,
    pub writer_chunk_rows: u64,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
}

/// The raw JSON document shape from spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigDocument {
    version: u32,
    global: GlobalConfig,
    profiles: HashMap<String, ProfileConfig>,
}

/// Where one effective setting came from, for `review`/status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(Utf8PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::ConfigFile(path) => write!(f, "config file ({path})"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

/// CLI-supplied overrides consumed during discovery.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub profile: Option<String>,
    pub output: Option<Utf8PathBuf>,
    pub sqlite_db: Option<Utf8PathBuf>,
}

/// Fully resolved configuration: the document plus which profile is active
/// and where each top-level section came from.
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub active_profile_name: String,
    pub active_profile: ProfileConfig,
    pub output: Option<Utf8PathBuf>,
    pub sqlite_db: Option<Utf8PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Discovers and loads configuration starting from the current directory.
    ///
    /// # Errors
    /// Returns [`SchemaforgeError::Config`] on a missing/unknown profile, a
    /// malformed document, or a negative value in a `u64`/`u32` field (JSON
    /// numbers that the schema requires positive but that parse as floats or
    /// negative integers are rejected explicitly, since `serde_json` alone
    /// would silently reject negatives into unsigned fields only at parse
    /// time without the offending path).
    pub fn discover(cli_args: &CliArgs) -> Result<Self, SchemaforgeError> {
        let start_dir = std::env::current_dir().map_err(|source| SchemaforgeError::Io {
            path: ".".to_string(),
            source,
        })?;
        let start_dir = Utf8PathBuf::from_path_buf(start_dir)
            .map_err(|p| SchemaforgeError::Config {
                path: p.display().to_string(),
                reason: "working directory is not valid UTF-8".to_string(),
            })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Path-driven variant used by tests to avoid relying on process CWD.
    ///
    /// # Errors
    /// Same as [`Config::discover`].
    pub fn discover_from(start_dir: &Utf8Path, cli_args: &CliArgs) -> Result<Self, SchemaforgeError> {
        let mut source_attribution = HashMap::new();

        let config_path = if let Some(explicit) = &cli_args.config_path {
            Some(explicit.clone())
        } else {
            discover_config_file_from(start_dir)
        };

        let document = if let Some(path) = &config_path {
            let raw = std::fs::read_to_string(path).map_err(|source| SchemaforgeError::Io {
                path: path.to_string(),
                source,
            })?;
            let doc: ConfigDocument = serde_json::from_str(&raw).map_err(|e| SchemaforgeError::Config {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            source_attribution.insert("global".to_string(), ConfigSource::ConfigFile(path.clone()));
            validate_document(&doc, path)?;
            doc
        } else {
            source_attribution.insert("global".to_string(), ConfigSource::Defaults);
            return Err(SchemaforgeError::Config {
                path: start_dir.to_string(),
                reason: format!("no {CONFIG_FILE_NAME} found and no built-in defaults apply"),
            });
        };

        let profile_name = cli_args
            .profile
            .clone()
            .unwrap_or_else(|| "default".to_string());
        if cli_args.profile.is_some() {
            source_attribution.insert("profile".to_string(), ConfigSource::Cli);
        }

        let active_profile = document
            .profiles
            .get(&profile_name)
            .cloned()
            .ok_or_else(|| SchemaforgeError::Config {
                path: config_path
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                reason: format!("unknown profile '{profile_name}'"),
            })?;

        let output = cli_args.output.clone();
        let sqlite_db = cli_args.sqlite_db.clone();
        if output.is_some() {
            source_attribution.insert("output".to_string(), ConfigSource::Cli);
        }
        if sqlite_db.is_some() {
            source_attribution.insert("sqlite_db".to_string(), ConfigSource::Cli);
        }

        Ok(Self {
            global: document.global,
            active_profile_name: profile_name,
            active_profile,
            output,
            sqlite_db,
            source_attribution,
        })
    }
}

/// Validates the positivity constraints spec'd for each profile, reporting
/// the offending JSON path the way a configuration error must.
fn validate_document(doc: &ConfigDocument, path: &Utf8Path) -> Result<(), SchemaforgeError> {
    if doc.version == 0 {
        return Err(SchemaforgeError::Config {
            path: path.to_string(),
            reason: "global.version must be > 0".to_string(),
        });
    }
    for (name, profile) in &doc.profiles {
        if profile.block_size == 0 {
            return Err(SchemaforgeError::Config {
                path: path.to_string(),
                reason: format!("profiles.{name}.block_size must be > 0"),
            });
        }
        if profile.min_gap_lines == 0 {
            return Err(SchemaforgeError::Config {
                path: path.to_string(),
                reason: format!("profiles.{name}.min_gap_lines must be > 0"),
            });
        }
        if profile.max_parallel_files == 0 {
            return Err(SchemaforgeError::Config {
                path: path.to_string(),
                reason: format!("profiles.{name}.max_parallel_files must be > 0"),
            });
        }
        if profile.sample_values_cap == 0 {
            return Err(SchemaforgeError::Config {
                path: path.to_string(),
                reason: format!("profiles.{name}.sample_values_cap must be > 0"),
            });
        }
        if profile.writer_chunk_rows == 0 {
            return Err(SchemaforgeError::Config {
                path: path.to_string(),
                reason: format!("profiles.{name}.writer_chunk_rows must be > 0"),
            });
        }
    }
    Ok(())
}

/// Walks up the directory tree looking for `schemaforge.json`, stopping at a
/// `.git` directory or the filesystem root.
#[must_use]
pub fn discover_config_file_from(start_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> &'static str {
        r#"{
            "version": 1,
            "global": { "encoding": "utf-8", "error_policy": "fail-fast",
                        "synonym_dictionary": null, "canonical_schema_path": null },
            "profiles": { "default": {
                "description": "test profile", "block_size": 4096,
                "min_gap_lines": 100, "max_parallel_files": 4,
                "sample_values_cap": 8, "writer_chunk_rows": 2048,
                "resource_limits": { "temp_dir": "/tmp/schemaforge" }
            }}
        }"#
    }

    #[test]
    fn discovers_config_in_ancestor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join(CONFIG_FILE_NAME), sample_document()).unwrap();
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = discover_config_file_from(&nested).unwrap();
        assert_eq!(found, root.join(CONFIG_FILE_NAME));
    }

    #[test]
    fn discovery_stops_at_git_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::create_dir_all(root.join("repo/.git")).unwrap();
        std::fs::write(root.join(CONFIG_FILE_NAME), sample_document()).unwrap();
        let nested = root.join("repo").join("sub");
        std::fs::create_dir_all(&nested).unwrap();

        assert!(discover_config_file_from(&nested).is_none());
    }

    #[test]
    fn unknown_profile_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join(CONFIG_FILE_NAME), sample_document()).unwrap();

        let cli = CliArgs {
            profile: Some("nope".to_string()),
            ..Default::default()
        };
        let err = Config::discover_from(root, &cli).unwrap_err();
        assert_eq!(err.category(), schemaforge_types::ErrorCategory::Configuration);
    }

    #[test]
    fn cli_output_override_is_attributed_to_cli() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join(CONFIG_FILE_NAME), sample_document()).unwrap();

        let cli = CliArgs {
            output: Some(Utf8PathBuf::from("/tmp/out")),
            ..Default::default()
        };
        let config = Config::discover_from(root, &cli).unwrap();
        assert_eq!(config.source_attribution.get("output"), Some(&ConfigSource::Cli));
    }
}
