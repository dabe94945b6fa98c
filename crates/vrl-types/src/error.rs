use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid record id: {0}")]
    InvalidId(String),

    #[error("invalid data type {value:?}: {reason}")]
    InvalidDataType { value: String, reason: String },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
