//! Build artifact documents and the seam through which they are read.
//!
//! Only the fields unimeta consumes are modelled; everything else in the
//! manifest and catalog is ignored.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::project::Project;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Parsed build manifest
#[derive(Debug, Default, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub metadata: ManifestMetadata,
    #[serde(default)]
    pub nodes: BTreeMap<String, RawNode>,
    #[serde(default)]
    pub sources: BTreeMap<String, RawSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub project_name: Option<String>,
}

/// A manifest entry under `nodes`
#[derive(Debug, Default, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: RawNodeConfig,
    #[serde(default)]
    pub depends_on: RawDependsOn,
    #[serde(default)]
    pub raw_code: Option<String>,
    #[serde(default)]
    pub raw_sql: Option<String>,
    #[serde(default)]
    pub original_file_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "ordered_map")]
    pub columns: Vec<(String, RawColumn)>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawNodeConfig {
    #[serde(default)]
    pub materialized: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawDependsOn {
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// A manifest entry under `sources`
#[derive(Debug, Default, Deserialize)]
pub struct RawSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_file_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "ordered_map")]
    pub columns: Vec<(String, RawColumn)>,
}

/// Column declared in project YAML and copied into the manifest
#[derive(Debug, Default, Deserialize)]
pub struct RawColumn {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parsed catalog
#[derive(Debug, Default, Deserialize)]
pub struct RawCatalog {
    #[serde(default)]
    pub nodes: BTreeMap<String, CatalogEntry>,
    #[serde(default)]
    pub sources: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub columns: BTreeMap<String, CatalogColumn>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogColumn {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default, alias = "description")]
    pub comment: Option<String>,
}

impl RawCatalog {
    /// Catalog entry for a manifest unique id, nodes before sources
    pub fn entry(&self, unique_id: &str) -> Option<&CatalogEntry> {
        self.nodes
            .get(unique_id)
            .or_else(|| self.sources.get(unique_id))
    }
}

/// Deserialize a JSON object into `(key, value)` pairs in document order.
fn ordered_map<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(OrderedVisitor(PhantomData))
}

/// Reads a project's build artifacts.
pub trait ArtifactSource: Send + Sync {
    /// The project's manifest, or `None` when it has not been built
    fn manifest(&self, project: &Project) -> CoreResult<Option<RawManifest>>;

    /// The project's catalog, or `None` when absent
    fn catalog(&self, project: &Project) -> CoreResult<Option<RawCatalog>>;
}

/// Artifact source reading JSON files below each project root.
#[derive(Debug, Clone)]
pub struct FsArtifacts {
    manifest_path: PathBuf,
    catalog_path: PathBuf,
}

impl FsArtifacts {
    pub fn new(manifest_path: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            catalog_path: catalog_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.manifest_path, &config.catalog_path)
    }
}

impl Default for FsArtifacts {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn read_optional(path: &Path) -> CoreResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

impl ArtifactSource for FsArtifacts {
    fn manifest(&self, project: &Project) -> CoreResult<Option<RawManifest>> {
        let path = project.root_path.join(&self.manifest_path);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CoreError::ManifestParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    fn catalog(&self, project: &Project) -> CoreResult<Option<RawCatalog>> {
        let path = project.root_path.join(&self.catalog_path);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CoreError::CatalogParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "artifacts_test.rs"]
mod tests;
