//! Durable backing for the decision log
//!
//! The log keeps its own in-memory index; a store only has to persist
//! sealed records in append order and hand them back at open.

use std::fmt::Debug;
use std::sync::Mutex;

use super::errors::{LogError, LogResult};
use super::record::DecisionRecord;

/// Append-only persistence for decision records
pub trait DecisionStore: Send + Sync + Debug {
    /// Loads every persisted record in append order.
    fn load(&self) -> LogResult<Vec<DecisionRecord>>;

    /// Durably appends one sealed record.
    ///
    /// The record must be visible to `load` once this returns `Ok`.
    fn persist(&self, record: &DecisionRecord) -> LogResult<()>;
}

/// In-memory store for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryDecisionStore {
    records: Mutex<Vec<DecisionRecord>>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionStore for MemoryDecisionStore {
    fn load(&self) -> LogResult<Vec<DecisionRecord>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| LogError::lock_poisoned())
    }

    fn persist(&self, record: &DecisionRecord) -> LogResult<()> {
        self.records
            .lock()
            .map_err(|_| LogError::lock_poisoned())?
            .push(record.clone());
        Ok(())
    }
}
