//! Error types for the metadata store and its services.

use thiserror::Error;

/// Metadata store errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Another refresh holds the build lock (X001).
    #[error("[X001] Refresh already in progress")]
    RefreshInProgress,

    /// No node with this global id (X002).
    #[error("[X002] Node not found: {id}")]
    NodeNotFound { id: String },

    /// The node exists but has no such column (X003).
    #[error("[X003] Column '{column}' not found on node '{node}'")]
    ColumnNotFound { node: String, column: String },

    /// Request is malformed (X004).
    #[error("[X004] Invalid request: {message}")]
    Validation { message: String },

    /// The build pipeline failed before producing a graph (X005).
    #[error("[X005] Build failed: {0}")]
    Build(#[from] um_core::CoreError),

    /// A background task panicked or was cancelled (X006).
    #[error("[X006] Background task failed: {message}")]
    Task { message: String },

    /// Snapshot document could not be read or written (X007).
    #[error("[X007] Snapshot file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The enrichment service failed (X008).
    #[error("[X008] Enrichment failed: {message}")]
    Enrichment { message: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<tokio::task::JoinError> for MetaError {
    fn from(err: tokio::task::JoinError) -> Self {
        MetaError::Task {
            message: err.to_string(),
        }
    }
}
