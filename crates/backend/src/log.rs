use async_trait::async_trait;
use press_core::TaskDescriptor;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::types::{ErrorRecord, HealthStatus};
use crate::BackendClient;

/// Backend that only writes reports to the log. Used for local runs.
#[derive(Debug, Clone, Default)]
pub struct LogBackend;

#[async_trait]
impl BackendClient for LogBackend {
    async fn get_task(&self) -> Result<Option<TaskDescriptor>> {
        Ok(None)
    }

    async fn report_started(&self, task_id: &str) -> Result<()> {
        info!(task_id, "Task started");
        Ok(())
    }

    async fn report_health_status(&self, status: &HealthStatus) -> Result<()> {
        debug!(worker_id = %status.worker_id, load = status.load, busy = status.busy, "Health");
        Ok(())
    }

    async fn report_finished(&self, task_id: &str) -> Result<()> {
        info!(task_id, "Task finished");
        Ok(())
    }

    async fn report_errored(&self, record: &ErrorRecord) -> Result<()> {
        error!(
            task_id = %record.task_id,
            code = record.code,
            service = %record.service,
            retryable = record.retryable,
            post = ?record.post_title,
            "{}",
            record.message
        );
        Ok(())
    }
}
