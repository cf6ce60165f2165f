use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The payload is not a valid descriptor. `task_id` is set when the
    /// payload still carried a readable `id`.
    #[error("Invalid task payload: {reason}")]
    InvalidTask {
        task_id: Option<String>,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, BackendError>;
