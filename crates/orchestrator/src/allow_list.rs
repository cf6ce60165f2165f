use press_core::{EntryMode, TaskMethod};

use crate::error::{OrchestratorError, Result};

/// Which methods a worker entry point may run.
pub struct AllowList;

impl AllowList {
    pub fn validate(mode: EntryMode, method: TaskMethod) -> Result<()> {
        if Self::allowed_methods(mode).contains(&method) {
            Ok(())
        } else {
            Err(OrchestratorError::not_allowed(method, mode))
        }
    }

    pub fn allowed_methods(mode: EntryMode) -> Vec<TaskMethod> {
        mode.allowed_methods()
    }

    pub fn is_allowed(mode: EntryMode, method: TaskMethod) -> bool {
        Self::validate(mode, method).is_ok()
    }
}
