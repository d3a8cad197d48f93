//! Pipeline configuration.
//!
//! Every component receives its paths and policies through a [`PipelineConfig`] value rather
//! than reading global constants, so tests can point a pipeline at a temporary directory.
//!
//! Precedence, lowest to highest: defaults, TOML file, `RETAIL_ETL_*` environment variables,
//! then whatever the caller (usually the CLI) sets on the returned value.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_BRONZE_PATH: &str = "data/bronze/online_retail_raw.csv";
pub const DEFAULT_SILVER_PATH: &str = "data/silver/cleaned_sales.parquet";
pub const DEFAULT_WAREHOUSE_PATH: &str = "data/gold/retail_dwh.db";
pub const DEFAULT_SCHEMA_SCRIPT: &str = "sql/schema.sql";
pub const DEFAULT_ANALYTICS_SCRIPT: &str = "sql/analytics.sql";

const ENV_PREFIX: &str = "RETAIL_ETL_";

/// Character encoding of the bronze source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceEncoding {
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[default]
    Latin1,
    Utf8,
}

impl FromStr for SourceEncoding {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            other => Err(PipelineError::config(format!("unknown encoding '{other}'"))),
        }
    }
}

/// How incoming rows are matched against rows already in `fact_sales`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Skip every line of an invoice if any line of it was loaded before.
    ///
    /// Known limitation: new lines added to a partially loaded invoice are dropped.
    #[default]
    InvoiceLevel,
    /// Skip only lines whose (invoice id, product code) pair was loaded before.
    LineLevel,
}

impl FromStr for DedupPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "invoice" | "invoice_level" => Ok(Self::InvoiceLevel),
            "line" | "line_level" => Ok(Self::LineLevel),
            other => Err(PipelineError::config(format!("unknown dedup policy '{other}'"))),
        }
    }
}

/// Paths and policies for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw CSV source.
    pub bronze_path: PathBuf,
    /// Parquet snapshot of the cleaned rows.
    pub silver_path: PathBuf,
    /// SQLite warehouse file.
    pub warehouse_path: PathBuf,
    /// Optional DDL script applied on first run instead of the default indexes.
    pub schema_script: Option<PathBuf>,
    /// Optional `;`-separated named queries replacing the default reports.
    pub analytics_script: Option<PathBuf>,
    pub encoding: SourceEncoding,
    pub dedup_policy: DedupPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bronze_path: PathBuf::from(DEFAULT_BRONZE_PATH),
            silver_path: PathBuf::from(DEFAULT_SILVER_PATH),
            warehouse_path: PathBuf::from(DEFAULT_WAREHOUSE_PATH),
            schema_script: Some(PathBuf::from(DEFAULT_SCHEMA_SCRIPT)),
            analytics_script: Some(PathBuf::from(DEFAULT_ANALYTICS_SCRIPT)),
            encoding: SourceEncoding::default(),
            dedup_policy: DedupPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// A config rooted at `dir`: `bronze.csv`, `silver.parquet`, `warehouse.db`, with no
    /// schema or analytics overrides.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            bronze_path: dir.join("bronze.csv"),
            silver_path: dir.join("silver.parquet"),
            warehouse_path: dir.join("warehouse.db"),
            schema_script: None,
            analytics_script: None,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> PipelineResult<Self> {
        toml::from_str(text).map_err(|e| PipelineError::config(format!("invalid config toml: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from an optional TOML file, then apply `RETAIL_ETL_*` environment overrides.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Apply overrides looked up by key (`BRONZE_PATH`, `SILVER_PATH`, `WAREHOUSE_PATH`,
    /// `SCHEMA_SCRIPT`, `ANALYTICS_SCRIPT`, `ENCODING`, `DEDUP_POLICY`).
    ///
    /// An empty value for either script disables that override.
    pub fn with_overrides<F>(mut self, lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BRONZE_PATH") {
            self.bronze_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SILVER_PATH") {
            self.silver_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("WAREHOUSE_PATH") {
            self.warehouse_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCHEMA_SCRIPT") {
            self.schema_script = optional_path(v);
        }
        if let Some(v) = lookup("ANALYTICS_SCRIPT") {
            self.analytics_script = optional_path(v);
        }
        if let Some(v) = lookup("ENCODING") {
            self.encoding = v.parse()?;
        }
        if let Some(v) = lookup("DEDUP_POLICY") {
            self.dedup_policy = v.parse()?;
        }
        Ok(self)
    }
}

fn optional_path(v: String) -> Option<PathBuf> {
    if v.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(v))
    }
}

/// Create the parent directory of `path` if it has one.
pub(crate) fn ensure_parent_dir(path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
