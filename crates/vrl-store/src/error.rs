/// Errors from relation store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be decoded into its typed form.
    #[error("corrupt row at sequence {sequence}: {reason}")]
    CorruptRow { sequence: i64, reason: String },

    /// A value that cannot be bound as a statement argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid or unreadable store configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection lock was poisoned by a panicking thread.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
