//! Background audit scheduling
//!
//! Runs the audit job on a fixed period, off the request path, with at
//! most one run in flight.

mod job;
mod runner;

pub use job::{AuditJob, AuditJobError, AuditOutcome, AuditTask, RunClaim, RunSlot};
pub use runner::{AuditScheduler, SchedulerHandle, SchedulerStats, DEFAULT_PERIOD};
