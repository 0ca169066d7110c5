//! Error types for identifier allocation

use thiserror::Error;

use crate::model::IdentifierKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not allocate a unique {kind} after {attempts} attempts")]
    Exhausted { kind: IdentifierKind, attempts: usize },

    #[error("Allocation not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
