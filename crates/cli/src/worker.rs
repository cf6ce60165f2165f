//! Worker loop: poll the backend, dispatch, repeat.

use anyhow::Result;
use backend::{BackendClient, BackendError, ErrorRecord};
use events::Event;
use orchestrator::TaskDispatcher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

const ERROR_BACKOFF: Duration = Duration::from_secs(10);
const INVALID_TASK_CODE: u16 = 400;

pub struct WorkerLoop {
    dispatcher: TaskDispatcher,
    backend: Arc<dyn BackendClient>,
    poll_interval: Duration,
    busy: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerLoop {
    pub fn new(
        dispatcher: TaskDispatcher,
        backend: Arc<dyn BackendClient>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            dispatcher,
            backend,
            poll_interval,
            busy: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn busy_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    /// Poll until shutdown is signalled. One task runs at a time.
    pub async fn run(&self) -> Result<()> {
        info!(
            entry_mode = %self.dispatcher.config().entry_mode,
            poll_interval = ?self.poll_interval,
            "Worker started"
        );

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Shutdown signal received, stopping worker");
                break;
            }

            match self.process_one_task().await {
                Ok(true) => {}
                Ok(false) => sleep(self.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "Failed to fetch task");
                    if let Some(bus) = self.dispatcher.event_bus() {
                        bus.emit(Event::Error {
                            message: e.to_string(),
                            context: Some("get_task".to_string()),
                        });
                    }
                    sleep(ERROR_BACKOFF).await;
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Fetch and run one task.
    ///
    /// Returns `Ok(false)` when there was nothing to do. A failing task is
    /// reported by the dispatcher and still counts as processed.
    pub async fn process_one_task(&self) -> Result<bool> {
        let task = match self.backend.get_task().await {
            Ok(Some(task)) => task,
            Ok(None) => return Ok(false),
            Err(BackendError::InvalidTask {
                task_id: Some(task_id),
                reason,
            }) => {
                self.reject_unparseable(&task_id, &reason).await;
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };

        self.busy.store(true, Ordering::Relaxed);
        let result = self.dispatcher.run(&task).await;
        self.busy.store(false, Ordering::Relaxed);

        match result {
            Ok(report) if report.is_partial() => {
                warn!(task_id = %report.task_id, failed_posts = ?report.failed_posts, "Task finished with failed posts");
            }
            Ok(report) => info!(task_id = %report.task_id, "Task completed"),
            Err(e) => warn!(task_id = %task.id, error = %e, "Task failed"),
        }
        Ok(true)
    }

    async fn reject_unparseable(&self, task_id: &str, reason: &str) {
        warn!(task_id, reason, "Rejecting unparseable task");
        let record = ErrorRecord::new(task_id, INVALID_TASK_CODE, "task", false, reason);
        if let Err(e) = self.backend.report_errored(&record).await {
            warn!(task_id, error = %e, "Failed to report unparseable task");
        }
    }
}

/// Set `shutdown` on Ctrl+C.
pub fn setup_signal_handler(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, finishing current task before exit");
                shutdown.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
        }
    });
}
