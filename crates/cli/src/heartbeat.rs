//! Periodic liveness reports, independent of task execution.

use backend::{BackendClient, HealthStatus};
use events::{Event, EventBus};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const LOADAVG: &str = "/proc/loadavg";

/// One-minute load average, `0.0` when it cannot be read.
pub fn load_average() -> f64 {
    read_load_average(Path::new(LOADAVG)).unwrap_or(0.0)
}

fn read_load_average(path: &Path) -> Option<f64> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_load_average(&content)
}

fn parse_load_average(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

/// Report health every `interval` until `shutdown` is set.
///
/// `busy` is only read; the heartbeat never touches task state.
pub fn spawn(
    backend: Arc<dyn BackendClient>,
    worker_id: String,
    interval: Duration,
    busy: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    event_bus: Option<EventBus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let status = HealthStatus::new(
                worker_id.clone(),
                load_average(),
                busy.load(Ordering::Relaxed),
            );
            debug!(load = status.load, busy = status.busy, "Heartbeat");
            if let Some(ref bus) = event_bus {
                bus.emit(Event::Heartbeat {
                    worker_id: worker_id.clone(),
                    load: status.load,
                });
            }
            if let Err(e) = backend.report_health_status(&status).await {
                warn!(error = %e, "Failed to report health");
            }
        }
    })
}
