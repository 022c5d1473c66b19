//! I/O error types.

use std::path::PathBuf;

use beammon_core::ConfigLoadError;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event line could not be decoded.
    #[error("{path:?} line {line}: {source}")]
    InvalidEvent {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization of an output record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid file contents.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] beammon_core::Error),
}
