//! Observable events
//!
//! Every line the logger emits names one of these events. Events are
//! explicit and typed so log consumers can rely on a closed vocabulary.

use std::fmt;

/// Observable events in fairtrail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Process startup begins
    BootStart,
    /// Stores opened, ready to serve
    BootComplete,
    /// Configuration loaded
    ConfigLoaded,
    /// HTTP server listening
    Serving,
    /// Shutdown initiated
    ShutdownStart,

    // Decision log
    /// A decision record was appended
    DecisionAppended,
    /// A decision failed validation at intake
    DecisionRejected,
    /// Decision log replayed from disk
    DecisionLogLoaded,
    /// A stored record failed checksum or content-hash verification (FATAL)
    DecisionLogCorruption,
    /// A transient storage failure is being retried
    StorageRetry,

    // Receipts
    /// A new receipt was created
    ReceiptGenerated,
    /// A batch of receipts was anchored under one Merkle root
    ReceiptBatchAnchored,
    /// A receipt was verified
    ReceiptVerified,

    // Auditing
    /// An audit run began
    AuditRunStart,
    /// An audit run finished
    AuditRunComplete,
    /// An audit run failed; the scheduler keeps going
    AuditRunFailed,
    /// A scheduler tick was dropped because a run was still executing
    AuditTickSkipped,
    /// A fairness or drift threshold was exceeded
    IncidentRaised,
    /// A test could not run on the available data
    ComputationSkipped,
    /// Scheduler loop started
    SchedulerStarted,
    /// Scheduler loop stopped
    SchedulerStopped,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "FAIRTRAIL_STARTUP_BEGIN",
            Event::BootComplete => "FAIRTRAIL_STARTUP_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "FAIRTRAIL_SERVING",
            Event::ShutdownStart => "SHUTDOWN_START",

            Event::DecisionAppended => "DECISION_APPENDED",
            Event::DecisionRejected => "DECISION_REJECTED",
            Event::DecisionLogLoaded => "DECISION_LOG_LOADED",
            Event::DecisionLogCorruption => "DECISION_LOG_CORRUPTION",
            Event::StorageRetry => "STORAGE_RETRY",

            Event::ReceiptGenerated => "RECEIPT_GENERATED",
            Event::ReceiptBatchAnchored => "RECEIPT_BATCH_ANCHORED",
            Event::ReceiptVerified => "RECEIPT_VERIFIED",

            Event::AuditRunStart => "AUDIT_RUN_BEGIN",
            Event::AuditRunComplete => "AUDIT_RUN_COMPLETE",
            Event::AuditRunFailed => "AUDIT_RUN_FAILED",
            Event::AuditTickSkipped => "AUDIT_TICK_SKIPPED",
            Event::IncidentRaised => "INCIDENT_RAISED",
            Event::ComputationSkipped => "COMPUTATION_SKIPPED",
            Event::SchedulerStarted => "SCHEDULER_STARTED",
            Event::SchedulerStopped => "SCHEDULER_STOPPED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::DecisionLogCorruption)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
