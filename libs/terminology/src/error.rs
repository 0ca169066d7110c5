//! Error types for the terminology registry

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid search pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Malformed source unit '{name}': {message}")]
    MalformedUnit { name: String, message: String },

    #[error("Source directory unavailable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background rebuild failed: {0}")]
    Rebuild(String),
}

pub type Result<T> = std::result::Result<T, Error>;
