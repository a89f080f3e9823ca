//! The decision log service
//!
//! Appends are serialized by a single writer mutex: id assignment, the
//! durable write and the index update all happen while it is held, so no
//! two appends share an id and the index never runs ahead of storage.
//! Readers only take the index `RwLock` and never see a record that has
//! not been persisted.

use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::merkle;
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};
use crate::retry::RetryPolicy;

use super::errors::{LogError, LogResult};
use super::record::{DecisionRecord, NewDecision};
use super::store::DecisionStore;

/// Restricts a snapshot to a subset of the log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFilter {
    /// Only records for this subject
    #[serde(default)]
    pub subject_id: Option<String>,
    /// Only records produced by this model version
    #[serde(default)]
    pub model_version: Option<String>,
    /// Only records with an id strictly greater than this
    #[serde(default)]
    pub since_id: Option<u64>,
}

impl SnapshotFilter {
    /// Returns true if `record` passes every set criterion.
    pub fn matches(&self, record: &DecisionRecord) -> bool {
        if let Some(ref subject) = self.subject_id {
            if record.subject_id() != subject {
                return false;
            }
        }
        if let Some(ref version) = self.model_version {
            if record.model_version() != version {
                return false;
            }
        }
        if let Some(since) = self.since_id {
            if record.id() <= since {
                return false;
            }
        }
        true
    }
}

/// Append-only, content-hashed decision log
#[derive(Debug)]
pub struct DecisionLog {
    store: Box<dyn DecisionStore>,
    records: RwLock<Vec<DecisionRecord>>,
    writer: Mutex<()>,
    retry: RetryPolicy,
    metrics: Arc<MetricsRegistry>,
}

impl DecisionLog {
    /// Opens the log, replaying and re-verifying every stored record.
    ///
    /// # Errors
    ///
    /// `FAIRTRAIL_LOG_CORRUPTION` if any stored record fails verification.
    pub fn open(store: Box<dyn DecisionStore>) -> LogResult<Self> {
        let records = store.load()?;
        for (index, record) in records.iter().enumerate() {
            if record.id() != index as u64 + 1 || !record.verify_content_hash() {
                return Err(LogError::corruption(format!(
                    "decision {} does not verify",
                    record.id()
                )));
            }
        }

        log_event_with_fields(
            Event::DecisionLogLoaded,
            &[("records", &records.len().to_string())],
        );

        Ok(Self {
            store,
            records: RwLock::new(records),
            writer: Mutex::new(()),
            retry: RetryPolicy::default(),
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    /// Replaces the retry policy for transient storage failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reports into a shared metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Validates, seals and durably appends a decision.
    ///
    /// # Errors
    ///
    /// - `FAIRTRAIL_LOG_VALIDATION` if the decision is malformed
    /// - `FAIRTRAIL_LOG_WRITE_FAILED` / `FAIRTRAIL_LOG_IO_ERROR` once retries
    ///   are exhausted; the record is then not in the log
    pub fn append(&self, decision: NewDecision) -> LogResult<DecisionRecord> {
        if let Err(e) = decision.validate() {
            self.metrics.increment_decisions_rejected();
            log_event_with_fields(
                Event::DecisionRejected,
                &[("subject_id", &decision.subject_id), ("reason", e.message())],
            );
            return Err(e);
        }

        let _writer = self.writer.lock().map_err(|_| LogError::lock_poisoned())?;

        let id = self.len()? as u64 + 1;
        let record = DecisionRecord::seal(id, decision, Utc::now())?;

        self.retry.run(
            || self.store.persist(&record),
            LogError::is_transient,
            |attempt, e| {
                self.metrics.increment_storage_retries();
                Logger::warn(
                    Event::StorageRetry.as_str(),
                    &[
                        ("attempt", &attempt.to_string()),
                        ("decision_id", &id.to_string()),
                        ("error", &e.to_string()),
                    ],
                );
            },
        )?;

        self.records
            .write()
            .map_err(|_| LogError::lock_poisoned())?
            .push(record.clone());

        self.metrics.increment_decisions_appended();
        log_event_with_fields(
            Event::DecisionAppended,
            &[
                ("content_hash", record.content_hash()),
                ("decision_id", &id.to_string()),
                ("subject_id", record.subject_id()),
            ],
        );

        Ok(record)
    }

    /// Looks up a record by id.
    pub fn get(&self, id: u64) -> LogResult<DecisionRecord> {
        let records = self.records.read().map_err(|_| LogError::lock_poisoned())?;
        id.checked_sub(1)
            .and_then(|index| records.get(index as usize))
            .cloned()
            .ok_or_else(|| LogError::not_found(id))
    }

    /// Point-in-time copy of every record passing `filter`, in id order.
    pub fn snapshot(&self, filter: &SnapshotFilter) -> LogResult<Vec<DecisionRecord>> {
        let records = self.records.read().map_err(|_| LogError::lock_poisoned())?;
        Ok(records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> LogResult<usize> {
        Ok(self
            .records
            .read()
            .map_err(|_| LogError::lock_poisoned())?
            .len())
    }

    pub fn is_empty(&self) -> LogResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Content hashes of every record, in id order.
    pub fn content_hashes(&self) -> LogResult<Vec<String>> {
        let records = self.records.read().map_err(|_| LogError::lock_poisoned())?;
        Ok(records
            .iter()
            .map(|record| record.content_hash().to_string())
            .collect())
    }

    /// Merkle root over every content hash in id order.
    ///
    /// Returns the empty-root sentinel for an empty log.
    pub fn merkle_root(&self) -> LogResult<String> {
        Ok(merkle::root(&self.content_hashes()?))
    }

    /// Checks a record against its own content hash and the stored copy.
    pub fn verify_record(&self, record: &DecisionRecord) -> LogResult<bool> {
        if !record.verify_content_hash() {
            return Ok(false);
        }
        let stored = self.get(record.id())?;
        Ok(stored.content_hash() == record.content_hash())
    }
}
