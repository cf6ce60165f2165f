//! Backend task service: where tasks come from and where their outcome goes.

mod error;
mod http;
mod log;
mod types;

pub use error::{BackendError, Result};
pub use http::HttpBackend;
pub use log::LogBackend;
pub use types::{ErrorRecord, HealthStatus};

use async_trait::async_trait;
use press_core::TaskDescriptor;

#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Next pending task, if any.
    async fn get_task(&self) -> Result<Option<TaskDescriptor>>;

    async fn report_started(&self, task_id: &str) -> Result<()>;

    async fn report_health_status(&self, status: &HealthStatus) -> Result<()>;

    async fn report_finished(&self, task_id: &str) -> Result<()>;

    async fn report_errored(&self, record: &ErrorRecord) -> Result<()>;
}
