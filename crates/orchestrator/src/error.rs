use press_core::{EntryMode, TaskMethod};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Method {method} is not allowed in {mode} mode")]
    MethodNotAllowed { method: TaskMethod, mode: EntryMode },

    #[error("Invalid task: {0}")]
    InvalidTask(#[from] press_core::CoreError),

    #[error("Git error: {0}")]
    Vcs(#[from] vcs::VcsError),

    #[error("Site error: {0}")]
    Site(#[from] site::SiteError),

    #[error("Backend error: {0}")]
    Backend(#[from] backend::BackendError),

    #[error("Task {task_id} has no {field} for step {step}")]
    MissingStepInput {
        task_id: String,
        step: String,
        field: &'static str,
    },
}

impl OrchestratorError {
    pub fn not_allowed(method: TaskMethod, mode: EntryMode) -> Self {
        Self::MethodNotAllowed { method, mode }
    }

    /// Whether re-dispatching the same task could succeed.
    ///
    /// Configuration problems never fix themselves; git, generator and
    /// backend failures may be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MethodNotAllowed { .. } | Self::InvalidTask(_) | Self::MissingStepInput { .. } => {
                false
            }
            Self::Vcs(e) => !e.is_configuration(),
            Self::Site(e) => matches!(e, site::SiteError::CommandFailed(_) | site::SiteError::Io(_)),
            Self::Backend(_) => true,
        }
    }

    /// HTTP-like status code reported with the error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => 405,
            Self::InvalidTask(_) | Self::MissingStepInput { .. } => 400,
            Self::Vcs(e) if e.is_configuration() => 400,
            Self::Vcs(_) => 502,
            Self::Site(site::SiteError::ConfigWrite { .. }) => 500,
            Self::Site(_) => 500,
            Self::Backend(_) => 503,
        }
    }

    /// Subsystem tag reported with the error.
    pub fn service(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } | Self::InvalidTask(_) | Self::MissingStepInput { .. } => {
                "task"
            }
            Self::Vcs(_) => "git",
            Self::Site(_) => "site",
            Self::Backend(_) => "backend",
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_not_retryable() {
        let err = OrchestratorError::from(vcs::VcsError::UnsupportedService("svn".to_string()));
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.service(), "git");

        let err = OrchestratorError::not_allowed(TaskMethod::Deploy, EntryMode::Post);
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 405);
        assert!(err.to_string().contains("deploy"));
    }

    #[test]
    fn test_network_errors_retryable() {
        let err = OrchestratorError::from(vcs::VcsError::CommandFailed("push rejected".to_string()));
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), 502);

        let err = OrchestratorError::from(site::SiteError::config_write("/x", "disk full"));
        assert!(!err.is_retryable());
        assert_eq!(err.service(), "site");
    }
}
