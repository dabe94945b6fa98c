use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] vrl_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] vrl_store::StoreError),

    #[error(transparent)]
    Type(#[from] vrl_types::TypeError),
}

impl SdkError {
    /// Missing and deleted entities both report as not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Ledger(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
