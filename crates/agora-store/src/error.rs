use agora_core::retry::RetryableError;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store call timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The blocking worker running the query died.
    #[error("store task failed: {0}")]
    Task(String),

    #[error("row not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl RetryableError for StoreError {
    fn timed_out(ms: u64) -> Self {
        StoreError::Timeout { ms }
    }

    /// Only lock contention and stalls are worth asking again for; a
    /// constraint violation or a bad query fails the same way every time.
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            StoreError::Database(_) | StoreError::NotFound(_) => false,
            StoreError::Timeout { .. } | StoreError::Task(_) => true,
        }
    }
}
