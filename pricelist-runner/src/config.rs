//! Serializable pipeline configuration.
//!
//! Loaded from TOML. Every section and field has a default, so an empty file
//! (or no file at all) describes a run over `./input` with the standard
//! `DAILY_PRICE_LIST_<Month>_<Day>_<Year>.pdf` naming.

use pricelist_core::analytics::DEFAULT_RANKING_SIZE;
use pricelist_core::data::date_resolver::{DEFAULT_EXTENSION, DEFAULT_PREFIX};
use pricelist_core::data::{DateResolver, ExtractOptions, NormalizeOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Process documents on the rayon pool. Results are identical either way.
    pub parallel: bool,
    pub input: InputConfig,
    pub extract: ExtractOptions,
    pub normalize: NormalizeOptions,
    pub output: OutputConfig,
    pub analytics: AnalyticsConfig,
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn resolver(&self) -> DateResolver {
        DateResolver::new(&self.input.prefix, &self.input.extension)
    }
}

/// Where documents come from and how they are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("input"),
            prefix: DEFAULT_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// Output artifact names, relative to `dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub merged_file: String,
    pub summary_file: String,
    pub aggregates_file: String,
    pub correlation_file: String,
    pub history_file: String,
    pub run_summary_file: String,
    /// Append the merged rows to the history file on every run.
    pub append_history: bool,
    /// Also write the merged dataset as Parquet next to the CSV.
    pub parquet: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            merged_file: "output.csv".into(),
            summary_file: "summary.csv".into(),
            aggregates_file: "daily_aggregates.csv".into(),
            correlation_file: "correlation.csv".into(),
            history_file: "stock_history.csv".into(),
            run_summary_file: "run_summary.json".into(),
            append_history: false,
            parquet: false,
        }
    }
}

impl OutputConfig {
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Parquet file sitting next to the merged CSV.
    pub fn parquet_path(&self) -> PathBuf {
        self.path(&self.merged_file).with_extension("parquet")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Length of the most/least traded lists in the run summary.
    pub ranking_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            ranking_size: DEFAULT_RANKING_SIZE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
