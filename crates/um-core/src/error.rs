//! Error types for um-core

use thiserror::Error;

/// Core error type for unimeta
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Projects directory not found
    #[error("[E004] Projects directory not found: {path}")]
    ProjectsDirNotFound { path: String },

    /// E005: Two project roots slugify to the same id
    #[error("[E005] Duplicate project id '{id}' declared by {path1} and {path2}")]
    DuplicateProject {
        id: String,
        path1: String,
        path2: String,
    },

    /// E006: Project descriptor could not be parsed
    #[error("[E006] Failed to parse project descriptor {path}: {message}")]
    DescriptorParseError { path: String, message: String },

    /// M001: Project has no build manifest
    #[error("[M001] Manifest not found for project '{project}': {path}")]
    ManifestMissing { project: String, path: String },

    /// M002: Build manifest present but unreadable
    #[error("[M002] Failed to parse manifest {path}: {message}")]
    ManifestParseError { path: String, message: String },

    /// M003: Catalog present but unreadable
    #[error("[M003] Failed to parse catalog {path}: {message}")]
    CatalogParseError { path: String, message: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
