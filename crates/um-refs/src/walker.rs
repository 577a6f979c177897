//! Source-text iteration.

use crate::error::{RefError, RefResult};
use std::path::{Path, PathBuf};
use um_core::Project;

/// A template/query file and its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    /// Model name implied by the file stem (`models/stg/orders.sql` -> `orders`).
    /// Used when no manifest entry claims the file.
    pub fn model_name(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }
}

/// Yields the source-text files of a project.
pub trait TextFileWalker: Send + Sync {
    fn walk(&self, project: &Project) -> RefResult<Vec<SourceFile>>;
}

/// Walks a project's model directories on disk.
#[derive(Debug, Clone)]
pub struct FsWalker {
    extensions: Vec<String>,
}

impl FsWalker {
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }

    fn collect(&self, dir: &Path, out: &mut Vec<PathBuf>) -> RefResult<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| RefError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| RefError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false);
            if hidden {
                continue;
            }
            if path.is_dir() {
                self.collect(&path, out)?;
            } else if self.wants(&path) {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl Default for FsWalker {
    fn default() -> Self {
        Self::new(vec!["sql".to_string()])
    }
}

impl TextFileWalker for FsWalker {
    /// Files are returned sorted by path; unreadable files are skipped.
    fn walk(&self, project: &Project) -> RefResult<Vec<SourceFile>> {
        let mut paths = Vec::new();
        for dir in project.model_paths_absolute() {
            if dir.is_dir() {
                self.collect(&dir, &mut paths)?;
            } else {
                log::debug!(
                    "Project '{}': model path {} does not exist",
                    project.id,
                    dir.display()
                );
            }
        }
        paths.sort();
        paths.dedup();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(content) => files.push(SourceFile { path, content }),
                Err(e) => log::warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }
        Ok(files)
    }
}
