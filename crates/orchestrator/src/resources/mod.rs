//! RAII guards for the task lifecycle.
//!
//! - [`TaskGuard`] - Guaranteed `task.finished` event

mod task_guard;

pub use task_guard::TaskGuard;
