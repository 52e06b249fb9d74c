use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The database abandoned the transaction on its own (disk full, I/O
    /// error). Nothing written through the unit of work survives.
    #[error("transaction was rolled back by the database")]
    RolledBack,
}

impl StorageError {
    /// Map a raw SQLite failure, lifting constraint violations into their own
    /// variant so callers can report them per item.
    pub(crate) fn from_write(err: rusqlite::Error, what: impl FnOnce() -> String) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = msg.unwrap_or_else(|| e.to_string());
                StorageError::ConstraintViolation(format!("{}: {detail}", what()))
            }
            other => StorageError::Sqlite(other),
        }
    }
}
