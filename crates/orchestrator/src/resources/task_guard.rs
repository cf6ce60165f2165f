//! RAII guard for task lifecycle events.
//!
//! Every task that emits `task.started` also emits exactly one
//! `task.finished`, including when the pipeline future is dropped midway.

use tracing::{debug, warn};

use events::{Event, EventBus};

pub struct TaskGuard {
    task_id: String,
    event_bus: Option<EventBus>,
    finished: bool,
}

impl TaskGuard {
    pub fn new(task_id: impl Into<String>, event_bus: Option<EventBus>) -> Self {
        let task_id = task_id.into();
        debug!(task_id = %task_id, "Task guard created");

        Self {
            task_id,
            event_bus,
            finished: false,
        }
    }

    /// Emit `task.finished` with the given outcome. Later calls are no-ops.
    pub fn finish(&mut self, success: bool) {
        if self.finished {
            return;
        }
        self.emit_finished(success);
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    fn emit_finished(&self, success: bool) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(Event::TaskFinished {
                task_id: self.task_id.clone(),
                success,
            });
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                task_id = %self.task_id,
                "Task guard dropped before the task finished - emitting failure"
            );
            self.emit_finished(false);
        }
    }
}
