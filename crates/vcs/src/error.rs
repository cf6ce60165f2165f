use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Unsupported git service: {0}")]
    UnsupportedService(String),

    #[error("Invalid repository descriptor: {0}")]
    InvalidRepository(String),

    #[error("Credential cleanup failed: {0}")]
    CredentialCleanup(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    /// Configuration problems cannot be fixed by running the task again.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VcsError::UnsupportedService(_) | VcsError::InvalidRepository(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VcsError>;
