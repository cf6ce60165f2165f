//! Progress events for the press worker
//!
//! The dispatcher publishes one event per pipeline milestone; anything that
//! wants to observe a running task (logging sinks, tests, a future status
//! endpoint) subscribes to the bus.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
