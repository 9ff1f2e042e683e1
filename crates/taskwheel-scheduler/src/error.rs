use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The frequency tag is not one of Daily / Weekly / Monthly.
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// The anchor datetime does not match `YYYY-MM-DD HH:MM`.
    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    /// No job with the given ID exists in the registry.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// The schedule store could not be read or written.
    #[error("Store I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    /// The schedule store contents are not a JSON sequence.
    #[error("Store parse error: {0}")]
    StoreParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
