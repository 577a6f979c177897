//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use um_core::Config;
use um_meta::{MetadataStore, SnapshotDocument};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run before the process exits.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main.rs exits with the code and prints nothing.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load `unimeta.yml` (explicit path, else the working directory, else
/// defaults) and apply the global path overrides.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::load_or_default(Path::new(".")).context("Failed to load config")?,
    };
    if let Some(dir) = &global.projects_dir {
        config.projects_dir = PathBuf::from(dir);
    }
    if let Some(path) = &global.output_path {
        config.output_path = PathBuf::from(path);
    }
    Ok(config)
}

/// Publish the saved snapshot into `store`, if there is one.
pub(crate) fn restore_snapshot(config: &Config, store: &MetadataStore) -> Result<bool> {
    let document = SnapshotDocument::load(&config.output_path).with_context(|| {
        format!(
            "Failed to read snapshot {}",
            config.output_path.display()
        )
    })?;
    match document {
        Some(document) => {
            document.restore_into(store);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// A store for read-only commands: the saved snapshot, or a fresh build
/// when asked for or when nothing has been saved yet.
pub(crate) fn open_store(config: &Config, fresh: bool) -> Result<MetadataStore> {
    let store = MetadataStore::new();
    if !fresh && restore_snapshot(config, &store)? {
        return Ok(store);
    }
    if !fresh {
        log::info!(
            "No snapshot at {}, building from {}",
            config.output_path.display(),
            config.projects_dir.display()
        );
    }
    let output = um_lineage::build(config).context("Failed to build lineage graph")?;
    store.publish(output);
    Ok(store)
}

/// Save the store's current snapshot to the configured output path.
pub(crate) fn save_snapshot(config: &Config, store: &MetadataStore) -> Result<()> {
    SnapshotDocument::from_snapshot(&store.snapshot())
        .save(&config.output_path)
        .with_context(|| format!("Failed to write {}", config.output_path.display()))
}

/// Pad-to-width helper for table output.
pub(crate) fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values.map(str::len).max().unwrap_or(0).max(header.len())
}
