//! Configuration types and parsing for unimeta.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "unimeta.yml";

/// Top-level configuration from unimeta.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory whose subdirectories are scanned for projects
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,

    /// Where the unified snapshot document is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// File names that mark a directory as a project root
    #[serde(default = "default_descriptor_files")]
    pub descriptor_files: Vec<String>,

    /// Build manifest location, relative to each project root
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,

    /// Catalog location, relative to each project root
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Extensions of source-text files scanned for references
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Link source tables to same-named models of other projects
    #[serde(default = "default_true")]
    pub bridge_sources_to_models: bool,

    /// Manual lineage edges added on top of the resolved graph
    #[serde(default)]
    pub overrides: Vec<LineageOverride>,

    /// Background poller settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Description enrichment settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// One operator-supplied lineage edge, by global id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineageOverride {
    /// Upstream node
    pub source: String,
    /// Downstream node
    pub target: String,
}

/// Poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Start the poller together with `serve`
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between polls
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Quiet period a change must survive before a refresh fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// File names whose changes trigger a refresh
    #[serde(default = "default_watch_patterns")]
    pub patterns: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            debounce_ms: default_debounce_ms(),
            patterns: default_watch_patterns(),
        }
    }
}

/// Enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichmentConfig {
    /// Run the enricher after every successful refresh
    #[serde(default)]
    pub enabled: bool,

    /// Upper bound for a single `describe` call
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_enrichment_timeout(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("dbt_projects")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("exports/uni_metadata.json")
}

fn default_descriptor_files() -> Vec<String> {
    vec!["dbt_project.yml".to_string(), "dbt_project.yaml".to_string()]
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("target/manifest.json")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("target/catalog.json")
}

fn default_source_extensions() -> Vec<String> {
    vec!["sql".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_watch_patterns() -> Vec<String> {
    vec!["manifest.json".to_string(), "catalog.json".to_string()]
}

fn default_enrichment_timeout() -> u64 {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            output_path: default_output_path(),
            descriptor_files: default_descriptor_files(),
            manifest_path: default_manifest_path(),
            catalog_path: default_catalog_path(),
            source_extensions: default_source_extensions(),
            bridge_sources_to_models: true,
            overrides: Vec::new(),
            watch: WatchConfig::default(),
            enrichment: EnrichmentConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `unimeta.yml` from `dir`, falling back to defaults when absent.
    pub fn load_or_default(dir: &Path) -> CoreResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
            Ok(Self::default())
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.descriptor_files.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "descriptor_files must list at least one file name".to_string(),
            });
        }
        if self.watch.interval_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "watch.interval_secs must be greater than zero".to_string(),
            });
        }
        if self.enrichment.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "enrichment.timeout_secs must be greater than zero".to_string(),
            });
        }
        if let Some(bad) = self
            .overrides
            .iter()
            .find(|o| o.source.trim().is_empty() || o.target.trim().is_empty())
        {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "override '{}' -> '{}' has an empty endpoint",
                    bad.source, bad.target
                ),
            });
        }
        Ok(())
    }

    /// Manifest path for a project rooted at `root`
    pub fn manifest_path_for(&self, root: &Path) -> PathBuf {
        root.join(&self.manifest_path)
    }

    /// Catalog path for a project rooted at `root`
    pub fn catalog_path_for(&self, root: &Path) -> PathBuf {
        root.join(&self.catalog_path)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
