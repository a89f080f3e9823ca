//! Append-only decision log
//!
//! Every decision is validated, given the next id, content-hashed and
//! durably persisted before it becomes visible to readers. Records are
//! never updated or deleted.

mod errors;
mod file_store;
mod log;
mod record;
mod store;

pub use errors::{LogError, LogErrorCode, LogResult, Severity};
pub use file_store::{FileDecisionStore, DECISIONS_FILE};
pub use log::{DecisionLog, SnapshotFilter};
pub use record::{is_positive_label, DecisionOutput, DecisionRecord, FeatureMap, NewDecision, POSITIVE_LABELS};
pub use store::{DecisionStore, MemoryDecisionStore};

#[cfg(test)]
pub(crate) use record::sample_decision;
