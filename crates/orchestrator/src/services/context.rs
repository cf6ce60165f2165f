use press_core::{GitAuthor, GitInfo, TaskDescriptor, WorkerConfig};
use std::path::PathBuf;

/// Everything the services of one task are built from.
///
/// Derived fresh from the worker config for every task and dropped with it.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: String,
    pub workspace: PathBuf,
    pub generator_dir: PathBuf,
    pub template_dir: PathBuf,
    pub generator_command: Vec<String>,
    pub author: GitAuthor,
    pub storage: GitInfo,
}

impl TaskContext {
    pub fn new(config: &WorkerConfig, task: &TaskDescriptor) -> Self {
        let storage = task.storage().clone();
        Self {
            task_id: task.id.clone(),
            workspace: config.workspace_for(&storage.repo),
            generator_dir: config.generator_dir.clone(),
            template_dir: config.template_dir.clone(),
            generator_command: config.generator_command.clone(),
            author: config.git_author.clone(),
            storage,
        }
    }
}
