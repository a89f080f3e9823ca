//! Metrics registry
//!
//! - Counters only, monotonic, reset on process start
//! - Thread-safe via atomics, Relaxed ordering is sufficient for counters
//!
//! One registry is created at startup and shared by `Arc` with every
//! service that reports into it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    decisions_appended: AtomicU64,
    decisions_rejected: AtomicU64,
    storage_retries: AtomicU64,
    receipts_generated: AtomicU64,
    receipts_anchored: AtomicU64,
    anchor_batches: AtomicU64,
    verifications: AtomicU64,
    verifications_failed: AtomicU64,
    audit_runs: AtomicU64,
    audit_failures: AtomicU64,
    audit_ticks_skipped: AtomicU64,
    incidents_raised: AtomicU64,
    counterfactual_searches: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        #[doc = concat!("Increment `", stringify!($field), "`")]
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        #[doc = concat!("Current value of `", stringify!($field), "`")]
        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl MetricsRegistry {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    counter!(increment_decisions_appended, decisions_appended, decisions_appended);
    counter!(increment_decisions_rejected, decisions_rejected, decisions_rejected);
    counter!(increment_storage_retries, storage_retries, storage_retries);
    counter!(increment_receipts_generated, receipts_generated, receipts_generated);
    counter!(increment_anchor_batches, anchor_batches, anchor_batches);
    counter!(increment_verifications, verifications, verifications);
    counter!(increment_verifications_failed, verifications_failed, verifications_failed);
    counter!(increment_audit_runs, audit_runs, audit_runs);
    counter!(increment_audit_failures, audit_failures, audit_failures);
    counter!(increment_audit_ticks_skipped, audit_ticks_skipped, audit_ticks_skipped);
    counter!(increment_counterfactual_searches, counterfactual_searches, counterfactual_searches);

    /// Add anchored receipts (a batch anchors several at once)
    pub fn add_receipts_anchored(&self, count: u64) {
        self.receipts_anchored.fetch_add(count, Ordering::Relaxed);
    }

    /// Receipts anchored so far
    pub fn receipts_anchored(&self) -> u64 {
        self.receipts_anchored.load(Ordering::Relaxed)
    }

    /// Add raised incidents
    pub fn add_incidents_raised(&self, count: u64) {
        self.incidents_raised.fetch_add(count, Ordering::Relaxed);
    }

    /// Incidents raised so far
    pub fn incidents_raised(&self) -> u64 {
        self.incidents_raised.load(Ordering::Relaxed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decisions_appended: self.decisions_appended(),
            decisions_rejected: self.decisions_rejected(),
            storage_retries: self.storage_retries(),
            receipts_generated: self.receipts_generated(),
            receipts_anchored: self.receipts_anchored(),
            anchor_batches: self.anchor_batches(),
            verifications: self.verifications(),
            verifications_failed: self.verifications_failed(),
            audit_runs: self.audit_runs(),
            audit_failures: self.audit_failures(),
            audit_ticks_skipped: self.audit_ticks_skipped(),
            incidents_raised: self.incidents_raised(),
            counterfactual_searches: self.counterfactual_searches(),
        }
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub decisions_appended: u64,
    pub decisions_rejected: u64,
    pub storage_retries: u64,
    pub receipts_generated: u64,
    pub receipts_anchored: u64,
    pub anchor_batches: u64,
    pub verifications: u64,
    pub verifications_failed: u64,
    pub audit_runs: u64,
    pub audit_failures: u64,
    pub audit_ticks_skipped: u64,
    pub incidents_raised: u64,
    pub counterfactual_searches: u64,
}
