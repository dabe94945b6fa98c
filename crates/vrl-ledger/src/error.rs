use vrl_store::StoreError;
use vrl_types::TypeError;

use crate::query::QueryShapeViolation;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No row for the requested id, exact timestamp, or page anchor.
    #[error("not found: {0}")]
    NotFound(String),

    /// An ad hoc statement failed the projection or relation contract.
    #[error("invalid query shape: {0}")]
    InvalidQueryShape(#[from] QueryShapeViolation),

    /// A payload did not deserialize into the requested shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// A value could not be serialized into a payload.
    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl LedgerError {
    /// `NotFound` is an expected outcome rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
