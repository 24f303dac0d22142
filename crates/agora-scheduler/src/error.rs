use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted trigger or action could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The provided trigger definition is invalid or can never fire.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A job with this ID is already registered.
    #[error("Job already scheduled: {id}")]
    DuplicateJob { id: String },

    /// No job with the given ID is registered.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
