//! Fairness and drift auditing
//!
//! - Statistical parity between the first two groups of a sensitive attribute
//! - KL drift of every numeric feature against a uniform reference
//! - Append-only incident storage
//!
//! Known limitations kept on purpose: only two groups are compared, and the
//! sensitive attribute defaults to the first candidate column present.

mod auditor;
mod drift;
mod errors;
mod frame;
mod incident;
mod parity;
mod store;

pub use auditor::{AuditReport, AuditorConfig, FairnessAuditor, SkippedTest, SENSITIVE_CANDIDATES};
pub use drift::{detect_drift, histogram, kl_divergence, ColumnSkip, DriftResult, DEFAULT_BINS, KL_EPSILON};
pub use errors::{FairnessError, FairnessResult};
pub use frame::{AuditFrame, AuditRow, DECISION_FIELD};
pub use incident::{Incident, IncidentSeverity, TestName};
pub use parity::{statistical_parity, ParityResult};
pub use store::{FileIncidentStore, IncidentStore, MemoryIncidentStore, INCIDENTS_FILE};
