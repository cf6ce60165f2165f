//! Event types emitted while a task runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping every event with an id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The dispatcher accepted a task
    #[serde(rename = "task.started")]
    TaskStarted { task_id: String, method: String },

    /// A pipeline step is about to run
    #[serde(rename = "step.started")]
    StepStarted { task_id: String, step: String },

    /// A pipeline step returned
    #[serde(rename = "step.finished")]
    StepFinished {
        task_id: String,
        step: String,
        success: bool,
    },

    /// One post of a batch failed; the batch continues
    #[serde(rename = "post.failed")]
    PostFailed {
        task_id: String,
        title: String,
        reason: String,
    },

    /// Terminal state of a task
    #[serde(rename = "task.finished")]
    TaskFinished { task_id: String, success: bool },

    /// Heartbeat sent to the backend
    #[serde(rename = "worker.heartbeat")]
    Heartbeat { worker_id: String, load: f64 },

    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Event::TaskStarted { task_id, .. }
            | Event::StepStarted { task_id, .. }
            | Event::StepFinished { task_id, .. }
            | Event::PostFailed { task_id, .. }
            | Event::TaskFinished { task_id, .. } => Some(task_id),
            Event::Heartbeat { .. } | Event::Error { .. } => None,
        }
    }

    /// Step name for step events.
    pub fn step(&self) -> Option<&str> {
        match self {
            Event::StepStarted { step, .. } | Event::StepFinished { step, .. } => Some(step),
            _ => None,
        }
    }
}
