use backend::{BackendClient, ErrorRecord};
use events::{Event, EventBus};
use press_core::{TaskDescriptor, TaskMethod, WorkerConfig};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::allow_list::AllowList;
use crate::error::{OrchestratorError, Result};
use crate::pipeline::{self, Step};
use crate::resources::TaskGuard;
use crate::services::{ServiceFactory, TaskContext, TaskServices};

/// Status code reported for a single failed post.
const POST_FAILURE_CODE: u16 = 422;

/// Summary of a task that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub task_id: String,
    pub method: TaskMethod,
    pub steps: Vec<Step>,
    /// Titles of posts that failed inside an otherwise successful task
    pub failed_posts: Vec<String>,
}

impl TaskReport {
    fn new(task: &TaskDescriptor) -> Self {
        Self {
            task_id: task.id.clone(),
            method: task.method(),
            steps: Vec::new(),
            failed_posts: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_posts.is_empty()
    }
}

/// Runs task descriptors through their pipelines.
pub struct TaskDispatcher {
    config: WorkerConfig,
    factory: Arc<dyn ServiceFactory>,
    backend: Arc<dyn BackendClient>,
    event_bus: Option<EventBus>,
}

impl TaskDispatcher {
    pub fn new(
        config: WorkerConfig,
        factory: Arc<dyn ServiceFactory>,
        backend: Arc<dyn BackendClient>,
    ) -> Self {
        Self {
            config,
            factory,
            backend,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.event_bus.as_ref()
    }

    /// Run one task to its terminal state and report that state.
    ///
    /// Disallowed or malformed tasks are rejected before any service is
    /// built. Any failing step aborts the remaining steps.
    pub async fn run(&self, task: &TaskDescriptor) -> Result<TaskReport> {
        let method = task.method();

        if let Err(e) = self.admit(task) {
            warn!(task_id = %task.id, %method, error = %e, "Task rejected");
            self.report_failure(&task.id, &e).await;
            return Err(e);
        }

        info!(task_id = %task.id, %method, "Task started");
        self.emit(Event::TaskStarted {
            task_id: task.id.clone(),
            method: method.to_string(),
        });
        let mut guard = TaskGuard::new(task.id.clone(), self.event_bus.clone());

        if let Err(e) = self.backend.report_started(&task.id).await {
            warn!(task_id = %task.id, error = %e, "Failed to report task start");
        }

        let ctx = TaskContext::new(&self.config, task);
        debug!(task_id = %task.id, workspace = %ctx.workspace.display(), "Task context ready");
        let services = self.factory.build(&ctx);

        match self.execute(task, &services).await {
            Ok(report) => {
                info!(
                    task_id = %task.id,
                    %method,
                    failed_posts = report.failed_posts.len(),
                    "Task finished"
                );
                if let Err(e) = self.backend.report_finished(&task.id).await {
                    warn!(task_id = %task.id, error = %e, "Failed to report task finish");
                }
                guard.finish(true);
                Ok(report)
            }
            Err(e) => {
                error!(task_id = %task.id, %method, error = %e, "Task failed");
                self.report_failure(&task.id, &e).await;
                guard.finish(false);
                Err(e)
            }
        }
    }

    fn admit(&self, task: &TaskDescriptor) -> Result<()> {
        AllowList::validate(self.config.entry_mode, task.method())?;
        task.validate()?;
        Ok(())
    }

    async fn execute(&self, task: &TaskDescriptor, services: &TaskServices) -> Result<TaskReport> {
        let mut report = TaskReport::new(task);

        for step in pipeline::plan(task.method()) {
            info!(task_id = %task.id, %step, "Step started");
            self.emit(Event::StepStarted {
                task_id: task.id.clone(),
                step: step.to_string(),
            });

            let result = self.execute_step(step, task, services, &mut report).await;

            self.emit(Event::StepFinished {
                task_id: task.id.clone(),
                step: step.to_string(),
                success: result.is_ok(),
            });

            match result {
                Ok(()) => {
                    info!(task_id = %task.id, %step, "Step finished");
                    report.steps.push(step);
                }
                Err(e) => {
                    error!(task_id = %task.id, %step, error = %e, "Step failed");
                    return Err(e);
                }
            }
        }

        Ok(report)
    }

    async fn execute_step(
        &self,
        step: Step,
        task: &TaskDescriptor,
        services: &TaskServices,
        report: &mut TaskReport,
    ) -> Result<()> {
        match step {
            Step::CreateRepository => services.git.create_repository().await?,
            Step::FetchRepository => services.git.fetch_repository().await?,
            Step::PrepareWorkspace => {
                let site = task.site().ok_or_else(|| missing(task, step, "site"))?;
                services.site.prepare_workspace(site).await?;
            }
            Step::SymlinkWorkspace => services.site.symlink_workspace_and_files().await?,
            Step::ApplyPosts(action) => {
                let outcomes = services.site.apply_posts(action, task.posts()).await;
                for outcome in outcomes {
                    if let Some(reason) = outcome.failure() {
                        self.report_post_failure(&task.id, &outcome.title, reason)
                            .await;
                        report.failed_posts.push(outcome.title.clone());
                    }
                }
            }
            Step::Commit { kind, allow_empty } => {
                let message = kind.message(&vcs::timestamp());
                let committed = services
                    .git
                    .commit_all_changes(&message, allow_empty)
                    .await?;
                if !committed {
                    info!(task_id = %task.id, "Nothing to commit");
                }
            }
            Step::Push { force } => services.git.push_to_remote(force).await?,
            Step::BuildStaticFiles => services.site.build_static_files().await?,
            Step::WriteMarkerFiles => {
                let domain = task.site().and_then(|site| site.site.custom_domain());
                services.site.write_marker_files(domain).await?;
            }
            Step::PublishToPages => {
                let publisher = task
                    .publisher()
                    .ok_or_else(|| missing(task, step, "publisher"))?;
                services
                    .git
                    .publish_to_pages(&services.site.public_dir(), publisher)
                    .await?;
            }
        }
        Ok(())
    }

    async fn report_post_failure(&self, task_id: &str, title: &str, reason: &str) {
        warn!(task_id, title, reason, "Post failed");
        self.emit(Event::PostFailed {
            task_id: task_id.to_string(),
            title: title.to_string(),
            reason: reason.to_string(),
        });

        let record =
            ErrorRecord::new(task_id, POST_FAILURE_CODE, "site", false, reason).for_post(title);
        if let Err(e) = self.backend.report_errored(&record).await {
            warn!(task_id, title, error = %e, "Failed to report post failure");
        }
    }

    async fn report_failure(&self, task_id: &str, error: &OrchestratorError) {
        let record = ErrorRecord::new(
            task_id,
            error.status_code(),
            error.service(),
            error.is_retryable(),
            error.to_string(),
        );
        if let Err(e) = self.backend.report_errored(&record).await {
            warn!(task_id, error = %e, "Failed to report task failure");
        }
    }

    fn emit(&self, event: Event) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(event);
        }
    }
}

fn missing(task: &TaskDescriptor, step: Step, field: &'static str) -> OrchestratorError {
    OrchestratorError::MissingStepInput {
        task_id: task.id.clone(),
        step: step.to_string(),
        field,
    }
}
