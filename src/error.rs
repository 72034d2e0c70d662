use thiserror::Error;

use crate::models::{TaskId, TaskKind};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Error)]
pub enum WorklistError {
    /// Rejected input; nothing was mutated.
    #[error("validation error: {0}")]
    Validation(String),

    /// Toggle/delete addressed an id that is not in the sequence.
    /// Hosts treat this as a silent no-op.
    #[error("task not found: {kind} {month_key} #{id}")]
    NotFound {
        kind: TaskKind,
        month_key: String,
        id: TaskId,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl WorklistError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
