//! Gateway configuration
//!
//! Loaded from a TOML file. Index specs may be declared inline under
//! `[[indices]]` or as YAML files in `indices_dir`.

use crate::index::{IndexSpec, IndexSpecLoader};
use crate::query::SortOrder;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub search: SearchDefaults,
    /// Directory with additional `*.yaml` index specs
    #[serde(default)]
    pub indices_dir: Option<PathBuf>,
    #[serde(default)]
    pub indices: Vec<IndexSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base URI of the Elasticsearch-compatible engine
    #[serde(default = "default_engine_uri")]
    pub uri: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_engine_uri() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            uri: default_engine_uri(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,facetgate=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

/// Defaults for search parameters not supplied by the caller
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchDefaults {
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_fragment_size")]
    pub fragment_size: usize,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_size() -> usize {
    10
}

fn default_fragment_size() -> usize {
    100
}

fn default_sort_by() -> String {
    "_score".to_string()
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            from: 0,
            size: default_size(),
            fragment_size: default_fragment_size(),
            sort_by: default_sort_by(),
            sort_order: SortOrder::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file and resolve `indices_dir`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::parse(path)?;
        config.load_index_specs()?;
        Ok(config)
    }

    /// Settings only: index specs are neither linted nor read from
    /// `indices_dir` until [`Config::load_index_specs`]. Nothing is logged.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load config from file path, or fall back to defaults if it is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Lint inline specs and append those found in `indices_dir`. Issues are
    /// logged as warnings.
    pub fn load_index_specs(&mut self) -> Result<()> {
        for spec in &self.indices {
            for issue in spec.lint() {
                tracing::warn!(index = %spec.name, "{}", issue);
            }
        }
        if let Some(dir) = &self.indices_dir {
            let loaded = IndexSpecLoader::new(dir).load_all()?;
            tracing::debug!(count = loaded.len(), dir = %dir.display(), "loaded index specs");
            self.indices.extend(loaded);
        }
        Ok(())
    }

    /// Look up an index by name; `None` selects the first configured index.
    pub fn index(&self, name: Option<&str>) -> Result<&IndexSpec> {
        match name {
            Some(name) => self
                .indices
                .iter()
                .find(|i| i.name == name)
                .ok_or_else(|| Error::IndexNotFound(name.to_string())),
            None => self
                .indices
                .first()
                .ok_or_else(|| Error::Config("no indices configured".to_string())),
        }
    }
}
