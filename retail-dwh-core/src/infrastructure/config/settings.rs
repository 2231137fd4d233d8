// retail-dwh-core/src/infrastructure/config/settings.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

use crate::domain::quality::QualityPolicy;

fn re_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

/// True for names that can be spliced into DDL as a schema identifier.
pub fn is_identifier(value: &str) -> bool {
    re_identifier().is_match(value)
}

fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_schema_identifier"))
    }
}

/// Text encodings `read_csv` understands.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-16")]
    Utf16,
    #[default]
    #[serde(rename = "latin-1")]
    Latin1,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Utf16 => "utf-16",
            SourceEncoding::Latin1 => "latin-1",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct SourceSettings {
    #[validate(length(min = 1, message = "Source path cannot be empty"))]
    pub path: String,

    #[serde(default)]
    pub encoding: SourceEncoding,

    /// Written to `source_file` on staged rows. Defaults to the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl SourceSettings {
    pub fn resolved_id(&self) -> String {
        self.source_id.clone().unwrap_or_else(|| {
            Path::new(&self.path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.clone())
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct WarehouseSettings {
    /// DuckDB database file, or `:memory:`.
    #[validate(length(min = 1))]
    #[serde(default = "default_db_path")]
    pub path: String,

    #[validate(custom(function = "validate_identifier"))]
    #[serde(default = "default_schema")]
    pub schema: String,

    #[validate(range(min = 1, max = 100_000))]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[validate(range(min = 1))]
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u32,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            schema: default_schema(),
            chunk_size: default_chunk_size(),
            lease_ttl_secs: default_lease_ttl(),
        }
    }
}

fn default_db_path() -> String {
    "warehouse/retail_dwh.duckdb".to_string()
}
fn default_schema() -> String {
    "retail_dwh".to_string()
}
fn default_chunk_size() -> usize {
    5000
}
fn default_lease_ttl() -> u32 {
    3600
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct EtlConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    #[validate(nested)]
    pub source: SourceSettings,

    #[validate(nested)]
    #[serde(default)]
    pub warehouse: WarehouseSettings,

    #[validate(nested)]
    #[serde(default)]
    pub quality: QualityPolicy,
}

fn default_target_path() -> String {
    "target".to_string()
}
fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}

impl EtlConfig {
    /// Anchors relative source and database paths on the project directory.
    pub fn resolve_paths(&mut self, project_dir: &Path) {
        self.source.path = anchor(project_dir, &self.source.path);
        if self.warehouse.path != ":memory:" {
            self.warehouse.path = anchor(project_dir, &self.warehouse.path);
        }
    }

    pub fn target_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.target_path)
    }
}

fn anchor(base: &Path, value: &str) -> String {
    let p = Path::new(value);
    if p.is_absolute() {
        value.to_string()
    } else {
        base.join(p).to_string_lossy().into_owned()
    }
}
