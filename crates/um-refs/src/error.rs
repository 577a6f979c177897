//! Error types for um-refs

use thiserror::Error;

/// Reference extraction errors
#[derive(Error, Debug)]
pub enum RefError {
    /// R001: A model directory or file could not be read
    #[error("[R001] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for RefError
pub type RefResult<T> = Result<T, RefError>;
