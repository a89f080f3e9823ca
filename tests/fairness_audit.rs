//! Fairness Audit Tests
//!
//! - Full disparity between two groups yields parity 1.0 and a HIGH incident
//! - Constant columns are skipped and never produce a drift incident
//! - Insufficient data is reported as skipped, not as an error
//! - Incidents raised by the audit job are durable and append-only

use std::sync::Arc;

use fairtrail::decision_log::{
    DecisionLog, DecisionOutput, DecisionRecord, FeatureMap, MemoryDecisionStore, NewDecision,
    SnapshotFilter,
};
use fairtrail::fairness::{
    AuditorConfig, ColumnSkip, FairnessAuditor, FileIncidentStore, IncidentSeverity,
    IncidentStore, TestName,
};
use fairtrail::scheduler::{AuditJob, AuditOutcome, AuditTask};
use tempfile::TempDir;
use uuid::Uuid;

// =============================================================================
// Test Utilities
// =============================================================================

fn new_decision(features: &[(&str, f64)], label: &str) -> NewDecision {
    let input_features: FeatureMap = features.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    NewDecision {
        subject_id: "applicant".into(),
        input_features,
        decision_output: DecisionOutput::new(label),
        explanation_text: String::new(),
        model_version: "demo-v1".into(),
    }
}

fn log_of(decisions: Vec<NewDecision>) -> Arc<DecisionLog> {
    let log = DecisionLog::open(Box::new(MemoryDecisionStore::new())).unwrap();
    for d in decisions {
        log.append(d).unwrap();
    }
    Arc::new(log)
}

fn snapshot(log: &DecisionLog) -> Vec<DecisionRecord> {
    log.snapshot(&SnapshotFilter::default()).unwrap()
}

/// Group 1 always approved, group 2 always denied.
fn disparate_log() -> Arc<DecisionLog> {
    let mut decisions = Vec::new();
    for i in 0..10 {
        let income = 30_000.0 + 1_000.0 * i as f64;
        decisions.push(new_decision(&[("region", 1.0), ("income", income)], "approved"));
        decisions.push(new_decision(&[("region", 2.0), ("income", income)], "denied"));
    }
    log_of(decisions)
}

// =============================================================================
// Statistical Parity
// =============================================================================

#[test]
fn test_full_disparity_raises_high_incident() {
    let log = disparate_log();
    let report = FairnessAuditor::default().run(&snapshot(&log));

    let parity = report.parity.as_ref().unwrap();
    assert_eq!(parity.attribute, "region");
    assert_eq!(parity.groups, ["1".to_string(), "2".to_string()]);
    assert_eq!(parity.value, 1.0);

    let high: Vec<_> = report
        .incidents
        .iter()
        .filter(|i| i.test_name == TestName::StatisticalParity)
        .collect();
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].severity, IncidentSeverity::High);
    assert_eq!(high[0].value, 1.0);
}

#[test]
fn test_group_order_follows_first_observation() {
    let log = log_of(vec![
        new_decision(&[("gender", 0.0)], "denied"),
        new_decision(&[("gender", 1.0)], "approved"),
    ]);
    let report = FairnessAuditor::default().run(&snapshot(&log));
    assert_eq!(report.parity_value(), Some(-1.0));
}

#[test]
fn test_equal_rates_raise_nothing() {
    let log = log_of(vec![
        new_decision(&[("region", 1.0)], "approved"),
        new_decision(&[("region", 1.0)], "denied"),
        new_decision(&[("region", 2.0)], "yes"),
        new_decision(&[("region", 2.0)], "no"),
    ]);
    let report = FairnessAuditor::default().run(&snapshot(&log));
    assert_eq!(report.parity_value(), Some(0.0));
    assert!(report
        .incidents
        .iter()
        .all(|i| i.test_name != TestName::StatisticalParity));
}

#[test]
fn test_configured_attribute_is_case_insensitive() {
    let log = log_of(vec![
        new_decision(&[("Region", 1.0), ("race", 1.0)], "approved"),
        new_decision(&[("Region", 2.0), ("race", 1.0)], "denied"),
    ]);
    let auditor = FairnessAuditor::new(AuditorConfig {
        sensitive_attribute: Some("region".into()),
        ..AuditorConfig::default()
    })
    .unwrap();
    let report = auditor.run(&snapshot(&log));
    assert_eq!(report.sensitive_attribute.as_deref(), Some("Region"));
    assert_eq!(report.parity_value(), Some(1.0));
}

#[test]
fn test_missing_sensitive_attribute_is_skipped() {
    let log = log_of(vec![
        new_decision(&[("income", 1.0)], "approved"),
        new_decision(&[("income", 2.0)], "denied"),
    ]);
    let report = FairnessAuditor::default().run(&snapshot(&log));
    assert!(report.parity.is_none());
    assert!(report
        .skipped
        .iter()
        .any(|s| s.test_name == TestName::StatisticalParity));
}

// =============================================================================
// Drift
// =============================================================================

#[test]
fn test_constant_columns_do_not_raise_drift() {
    let log = log_of(
        (0..20)
            .map(|_| new_decision(&[("income", 40_000.0), ("age", 30.0), ("region", 1.0)], "approved"))
            .collect(),
    );
    let report = FairnessAuditor::default().run(&snapshot(&log));

    assert_eq!(report.drift_score(), 0.0);
    assert!(report.drift.columns.is_empty());
    assert!(report
        .drift
        .skipped
        .iter()
        .all(|(_, reason)| *reason == ColumnSkip::Constant));
    assert!(report.incidents.is_empty());
    assert!(report.skipped.iter().any(|s| s.test_name == TestName::Drift));
}

#[test]
fn test_uniform_column_scores_near_zero() {
    let log = log_of(
        (0..50)
            .map(|i| new_decision(&[("income", i as f64)], "approved"))
            .collect(),
    );
    let report = FairnessAuditor::default().run(&snapshot(&log));
    assert!(report.drift_score() < 0.01, "score {}", report.drift_score());
}

#[test]
fn test_skewed_column_raises_medium_drift_incident() {
    let mut decisions: Vec<_> = (0..19)
        .map(|_| new_decision(&[("income", 10_000.0)], "approved"))
        .collect();
    decisions.push(new_decision(&[("income", 900_000.0)], "approved"));
    let report = FairnessAuditor::default().run(&snapshot(&log_of(decisions)));

    assert!(report.drift_score() > 0.5);
    let drift: Vec<_> = report
        .incidents
        .iter()
        .filter(|i| i.test_name == TestName::Drift)
        .collect();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].severity, IncidentSeverity::Medium);
}

// =============================================================================
// Incident Persistence
// =============================================================================

#[test]
fn test_audit_job_persists_incidents_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let log = disparate_log();

    let first_run: Vec<Uuid> = {
        let store = Arc::new(FileIncidentStore::open(temp_dir.path()).unwrap());
        let job = AuditJob::new(log.clone(), FairnessAuditor::default(), store.clone());
        match job.run().unwrap() {
            AuditOutcome::Completed(report) => report.incidents.iter().map(|i| i.id).collect(),
            AuditOutcome::Empty => panic!("log is not empty"),
        }
    };
    assert!(!first_run.is_empty());

    let store = Arc::new(FileIncidentStore::open(temp_dir.path()).unwrap());
    let ids: Vec<Uuid> = store.list().unwrap().iter().map(|i| i.id).collect();
    assert_eq!(ids, first_run);

    // Repeated detections are a time series, not deduplicated
    let job = AuditJob::new(log, FairnessAuditor::default(), store.clone());
    job.run().unwrap();
    let all: Vec<Uuid> = store.list().unwrap().iter().map(|i| i.id).collect();
    assert_eq!(all.len(), first_run.len() * 2);
    assert_eq!(&all[..first_run.len()], &first_run[..]);
}

#[test]
fn test_invalid_auditor_config_rejected() {
    let config = AuditorConfig {
        drift_bins: 1,
        ..AuditorConfig::default()
    };
    assert!(FairnessAuditor::new(config).is_err());
}
