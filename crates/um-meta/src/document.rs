//! The persisted snapshot document (`uni_metadata.json`).

use crate::error::{MetaError, MetaResult};
use crate::store::{MetadataStore, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use um_core::{Edge, Node, Project};

/// On-disk form of a snapshot: `{projects, models, lineage}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub projects: Vec<Project>,
    pub models: Vec<Node>,
    pub lineage: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl SnapshotDocument {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            projects: snapshot.projects.clone(),
            models: snapshot.graph.nodes().to_vec(),
            lineage: snapshot.graph.edges().to_vec(),
            generated_at: snapshot.published_at,
        }
    }

    /// Write the document atomically: a uniquely named sibling temp file is
    /// renamed over the target, so readers see the old or the new file.
    pub fn save(&self, path: &Path) -> MetaResult<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MetaError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        let temp_path =
            path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&temp_path, &json).map_err(|e| MetaError::Io {
            path: temp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            MetaError::Io {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        log::debug!("Wrote snapshot to {}", path.display());
        Ok(())
    }

    /// Read a previously saved document; `None` when the file does not exist.
    pub fn load(path: &Path) -> MetaResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| MetaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Publish this document's contents into `store`.
    pub fn restore_into(self, store: &MetadataStore) {
        store.replace_all(self.projects, self.models, self.lineage);
    }
}
