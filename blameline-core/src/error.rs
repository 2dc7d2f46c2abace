//! Error types for blameline-core

use thiserror::Error;

/// Main error type for the blameline-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// git exited with a failure status or could not be spawned
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    /// git produced more output than the configured ceiling
    #[error("git output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Document could not be decoded or resolved
    #[error("document error: {0}")]
    Document(String),
}

/// Result type alias for blameline-core
pub type Result<T> = std::result::Result<T, Error>;
