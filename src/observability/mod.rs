//! Observability subsystem
//!
//! - Structured JSON logging, one line per event
//! - Typed lifecycle and audit events
//! - Monotonic counters
//!
//! Observability never fails an operation: write errors on the log sink
//! are ignored.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
