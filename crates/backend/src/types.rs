use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure reported for a task or one of its posts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorRecord {
    pub task_id: String,
    pub code: u16,
    /// Subsystem that failed (`git`, `site`, `task`, ...)
    pub service: String,
    pub retryable: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
}

impl ErrorRecord {
    pub fn new(
        task_id: impl Into<String>,
        code: u16,
        service: impl Into<String>,
        retryable: bool,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            code,
            service: service.into(),
            retryable,
            message: message.into(),
            post_title: None,
        }
    }

    pub fn for_post(mut self, title: impl Into<String>) -> Self {
        self.post_title = Some(title.into());
        self
    }
}

/// Periodic liveness report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub worker_id: String,
    pub load: f64,
    pub busy: bool,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn new(worker_id: impl Into<String>, load: f64, busy: bool) -> Self {
        Self {
            worker_id: worker_id.into(),
            load,
            busy,
            timestamp: Utc::now(),
        }
    }
}
