//! The periodic audit job
//!
//! Reads the full decision log, audits it and appends any incidents.
//! A log with no decisions is a no-op.
//!
//! Every caller, scheduled or manual, must claim the task's [`RunSlot`]
//! first, so two runs of the same job never overlap.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::decision_log::{DecisionLog, LogError, SnapshotFilter};
use crate::fairness::{AuditReport, FairnessAuditor, FairnessError, IncidentStore};
use crate::observability::{log_event, log_event_with_fields, Event, Logger, MetricsRegistry};

/// Audit job errors
#[derive(Debug, Error)]
pub enum AuditJobError {
    #[error("Failed to read decision snapshot: {0}")]
    Snapshot(#[from] LogError),

    #[error("Failed to store incidents: {0}")]
    Incidents(#[from] FairnessError),

    #[error("An audit run is already in progress")]
    Busy,
}

impl AuditJobError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AuditJobError::Snapshot(e) if e.is_transient() => 503,
            AuditJobError::Snapshot(_) => 500,
            AuditJobError::Incidents(e) => e.status_code(),
            AuditJobError::Busy => 409,
        }
    }
}

/// Result of one audit run
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// The log holds no decisions; nothing was audited
    Empty,
    /// The audit ran; its incidents are persisted
    Completed(AuditReport),
}

impl AuditOutcome {
    pub fn incidents_raised(&self) -> usize {
        match self {
            AuditOutcome::Empty => 0,
            AuditOutcome::Completed(report) => report.incidents.len(),
        }
    }
}

/// At most one holder at a time; cloning shares the same slot
#[derive(Debug, Clone, Default)]
pub struct RunSlot(Arc<AtomicBool>);

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the slot, or `None` if a run already holds it.
    pub fn try_claim(&self) -> Option<RunClaim> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunClaim(Arc::clone(&self.0)))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Proof of holding a [`RunSlot`]; released on drop, including unwinding
#[derive(Debug)]
pub struct RunClaim(Arc<AtomicBool>);

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A unit of work the scheduler can run
pub trait AuditTask: Send + Sync + Debug {
    /// The slot every run of this task claims
    fn slot(&self) -> &RunSlot;

    /// Runs once while the caller holds `claim` on [`AuditTask::slot`].
    fn run_claimed(&self, claim: &RunClaim) -> Result<AuditOutcome, AuditJobError>;

    /// Claims the slot and runs.
    ///
    /// # Errors
    ///
    /// [`AuditJobError::Busy`] without running if another run holds the slot.
    fn run(&self) -> Result<AuditOutcome, AuditJobError> {
        let claim = self.slot().try_claim().ok_or(AuditJobError::Busy)?;
        self.run_claimed(&claim)
    }
}

/// Snapshot, audit, persist
#[derive(Debug)]
pub struct AuditJob {
    log: Arc<DecisionLog>,
    auditor: FairnessAuditor,
    incidents: Arc<dyn IncidentStore>,
    metrics: Arc<MetricsRegistry>,
    slot: RunSlot,
}

impl AuditJob {
    pub fn new(
        log: Arc<DecisionLog>,
        auditor: FairnessAuditor,
        incidents: Arc<dyn IncidentStore>,
    ) -> Self {
        Self {
            log,
            auditor,
            incidents,
            metrics: Arc::new(MetricsRegistry::new()),
            slot: RunSlot::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    fn execute(&self) -> Result<AuditOutcome, AuditJobError> {
        let snapshot = self.log.snapshot(&SnapshotFilter::default())?;
        if snapshot.is_empty() {
            return Ok(AuditOutcome::Empty);
        }

        let report = self.auditor.run(&snapshot);
        for incident in &report.incidents {
            self.incidents.append(incident)?;
        }
        Ok(AuditOutcome::Completed(report))
    }
}

impl AuditTask for AuditJob {
    fn slot(&self) -> &RunSlot {
        &self.slot
    }

    fn run_claimed(&self, _claim: &RunClaim) -> Result<AuditOutcome, AuditJobError> {
        log_event(Event::AuditRunStart);
        match self.execute() {
            Ok(outcome) => {
                self.metrics.increment_audit_runs();
                self.metrics
                    .add_incidents_raised(outcome.incidents_raised() as u64);
                let records = match outcome {
                    AuditOutcome::Empty => 0,
                    AuditOutcome::Completed(ref report) => report.records,
                };
                log_event_with_fields(
                    Event::AuditRunComplete,
                    &[
                        ("incidents", &outcome.incidents_raised().to_string()),
                        ("records", &records.to_string()),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.increment_audit_failures();
                Logger::error(Event::AuditRunFailed.as_str(), &[("error", &e.to_string())]);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_log::{sample_decision, MemoryDecisionStore};
    use crate::fairness::{Incident, MemoryIncidentStore, TestName};

    /// Rejects every append.
    #[derive(Debug)]
    struct BrokenIncidentStore;

    impl IncidentStore for BrokenIncidentStore {
        fn append(&self, _incident: &Incident) -> crate::fairness::FairnessResult<()> {
            Err(FairnessError::Storage("disk full".into()))
        }

        fn list(&self) -> crate::fairness::FairnessResult<Vec<Incident>> {
            Ok(Vec::new())
        }
    }

    fn log_with_disparity() -> Arc<DecisionLog> {
        let log = DecisionLog::open(Box::new(MemoryDecisionStore::new())).unwrap();
        for (region, decision) in [(1.0, "approved"), (2.0, "denied"), (1.0, "approved"), (2.0, "denied")] {
            let mut d = sample_decision("u", decision);
            d.input_features.insert("region".into(), region);
            log.append(d).unwrap();
        }
        Arc::new(log)
    }

    #[test]
    fn test_empty_log_is_noop() {
        let log = Arc::new(DecisionLog::open(Box::new(MemoryDecisionStore::new())).unwrap());
        let store = Arc::new(MemoryIncidentStore::new());
        let job = AuditJob::new(log, FairnessAuditor::default(), store.clone());
        assert_eq!(job.run().unwrap(), AuditOutcome::Empty);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_incidents_are_persisted() {
        let store = Arc::new(MemoryIncidentStore::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let job = AuditJob::new(log_with_disparity(), FairnessAuditor::default(), store.clone())
            .with_metrics(Arc::clone(&metrics));

        let outcome = job.run().unwrap();
        let stored = store.list().unwrap();
        assert_eq!(stored.len(), outcome.incidents_raised());
        assert!(stored.iter().any(|i| i.test_name == TestName::StatisticalParity));
        assert_eq!(metrics.audit_runs(), 1);
        assert_eq!(metrics.incidents_raised(), stored.len() as u64);
    }

    #[test]
    fn test_repeated_runs_append_again() {
        let store = Arc::new(MemoryIncidentStore::new());
        let job = AuditJob::new(log_with_disparity(), FairnessAuditor::default(), store.clone());
        let first = job.run().unwrap().incidents_raised();
        job.run().unwrap();
        assert_eq!(store.list().unwrap().len(), first * 2);
    }

    #[test]
    fn test_store_failure_is_reported() {
        let metrics = Arc::new(MetricsRegistry::new());
        let job = AuditJob::new(
            log_with_disparity(),
            FairnessAuditor::default(),
            Arc::new(BrokenIncidentStore),
        )
        .with_metrics(Arc::clone(&metrics));

        let err = job.run().unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(metrics.audit_failures(), 1);
    }

    #[test]
    fn test_run_while_slot_is_held_is_busy() {
        let store = Arc::new(MemoryIncidentStore::new());
        let job = AuditJob::new(log_with_disparity(), FairnessAuditor::default(), store.clone());

        let claim = job.slot().try_claim().unwrap();
        let err = job.run().unwrap_err();
        assert!(matches!(err, AuditJobError::Busy));
        assert_eq!(err.status_code(), 409);
        assert!(store.list().unwrap().is_empty());

        drop(claim);
        assert!(!job.slot().is_busy());
        assert!(job.run().is_ok());
    }

    #[test]
    fn test_slot_is_released_after_failure() {
        let job = AuditJob::new(
            log_with_disparity(),
            FairnessAuditor::default(),
            Arc::new(BrokenIncidentStore),
        );
        assert!(job.run().is_err());
        assert!(job.slot().try_claim().is_some());
    }
}
