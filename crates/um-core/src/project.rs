//! Project discovery
//!
//! A project is any non-hidden subdirectory of the projects root that carries
//! a descriptor file (`dbt_project.yml` by default). The descriptor supplies
//! the display name and the model tree scanned for references.

use crate::error::{CoreError, CoreResult};
use crate::ids::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One discovered project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Slug of the declared project name
    pub id: ProjectId,

    /// Name as declared in the descriptor (or the directory name)
    pub display_name: String,

    /// Absolute or caller-relative project root
    pub root_path: PathBuf,

    /// Model directories relative to `root_path`
    #[serde(default = "default_model_paths", skip_serializing)]
    pub model_paths: Vec<String>,
}

/// The subset of a project descriptor unimeta reads.
#[derive(Debug, Default, Deserialize)]
struct Descriptor {
    #[serde(default)]
    name: Option<String>,

    #[serde(default, rename = "model-paths", alias = "source-paths")]
    model_paths: Option<Vec<String>>,
}

fn default_model_paths() -> Vec<String> {
    vec!["models".to_string()]
}

/// Turn a declared project name into its id: lowercase, spaces to `_`.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

impl Project {
    /// Build a project from its root directory and descriptor file.
    ///
    /// A descriptor that cannot be parsed is not fatal: the directory name
    /// stands in for the project name and the default model tree is used.
    pub fn from_descriptor(root: &Path, descriptor: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(descriptor).map_err(|e| CoreError::IoWithPath {
            path: descriptor.display().to_string(),
            source: e,
        })?;
        let parsed = match serde_yaml::from_str::<Descriptor>(&content) {
            Ok(d) => d,
            Err(e) => {
                log::warn!(
                    "{}",
                    CoreError::DescriptorParseError {
                        path: descriptor.display().to_string(),
                        message: e.to_string(),
                    }
                );
                Descriptor::default()
            }
        };

        let dir_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display_name = parsed
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(dir_name);
        let id = ProjectId::try_new(slugify(&display_name)).ok_or_else(|| {
            CoreError::DescriptorParseError {
                path: descriptor.display().to_string(),
                message: "project name is empty".to_string(),
            }
        })?;

        Ok(Self {
            id,
            display_name,
            root_path: root.to_path_buf(),
            model_paths: parsed.model_paths.unwrap_or_else(default_model_paths),
        })
    }

    /// Absolute model directories
    pub fn model_paths_absolute(&self) -> Vec<PathBuf> {
        self.model_paths
            .iter()
            .map(|p| self.root_path.join(p))
            .collect()
    }
}

/// Enumerate the projects under `root`.
///
/// A missing root yields an empty list and a warning, and a directory whose
/// descriptor cannot be read is skipped with one. Subdirectories are
/// visited in name order. Two roots that produce the same project id are
/// rejected with [`CoreError::DuplicateProject`].
pub fn discover(root: &Path, descriptor_files: &[String]) -> CoreResult<Vec<Project>> {
    if !root.is_dir() {
        log::warn!(
            "Projects directory {} does not exist; no projects discovered",
            root.display()
        );
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(root).map_err(|e| CoreError::IoWithPath {
        path: root.display().to_string(),
        source: e,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && !is_hidden(path))
        .collect();
    dirs.sort();

    let mut projects: Vec<Project> = Vec::new();
    let mut seen: HashMap<ProjectId, PathBuf> = HashMap::new();

    for dir in dirs {
        let Some(descriptor) = descriptor_files
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
        else {
            log::debug!("Skipping {}: no project descriptor", dir.display());
            continue;
        };

        let project = match Project::from_descriptor(&dir, &descriptor) {
            Ok(project) => project,
            Err(e) => {
                log::warn!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };
        if let Some(previous) = seen.get(&project.id) {
            return Err(CoreError::DuplicateProject {
                id: project.id.to_string(),
                path1: previous.display().to_string(),
                path2: dir.display().to_string(),
            });
        }
        log::debug!("Discovered project '{}' at {}", project.id, dir.display());
        seen.insert(project.id.clone(), dir);
        projects.push(project);
    }

    Ok(projects)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
