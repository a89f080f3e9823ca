//! # Fairness Auditor
//!
//! Runs statistical parity and drift over a snapshot and produces at most
//! one incident per test per run. The auditor does not persist anything;
//! callers append the returned incidents to an incident store.

use serde::{Deserialize, Serialize};

use crate::decision_log::DecisionRecord;
use crate::observability::{log_event_with_fields, Event, Logger};

use super::drift::{detect_drift, DriftResult, DEFAULT_BINS};
use super::errors::{FairnessError, FairnessResult};
use super::frame::{AuditFrame, DECISION_FIELD};
use super::incident::{Incident, IncidentSeverity, TestName};
use super::parity::{statistical_parity, ParityResult};

/// Columns tried, in column order, when no sensitive attribute is given
pub const SENSITIVE_CANDIDATES: [&str; 3] = ["region", "gender", "race"];

/// Auditor thresholds and defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditorConfig {
    pub fairness_threshold: f64,
    pub drift_threshold: f64,
    pub drift_bins: usize,
    pub sensitive_attribute: Option<String>,
    pub outcome_field: String,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            fairness_threshold: 0.1,
            drift_threshold: 0.5,
            drift_bins: DEFAULT_BINS,
            sensitive_attribute: None,
            outcome_field: DECISION_FIELD.to_string(),
        }
    }
}

impl AuditorConfig {
    pub fn validate(&self) -> FairnessResult<()> {
        for (name, value) in [
            ("fairness_threshold", self.fairness_threshold),
            ("drift_threshold", self.drift_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FairnessError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number",
                    name
                )));
            }
        }
        if self.drift_bins < 2 {
            return Err(FairnessError::InvalidConfig(
                "drift_bins must be at least 2".into(),
            ));
        }
        if self.outcome_field.trim().is_empty() {
            return Err(FairnessError::InvalidConfig(
                "outcome_field must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A test that could not run on this snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTest {
    pub test_name: TestName,
    pub reason: String,
}

/// Everything one audit run measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub records: usize,
    pub sensitive_attribute: Option<String>,
    pub parity: Option<ParityResult>,
    pub drift: DriftResult,
    pub skipped: Vec<SkippedTest>,
    pub incidents: Vec<Incident>,
}

impl AuditReport {
    pub fn drift_score(&self) -> f64 {
        self.drift.score
    }

    pub fn parity_value(&self) -> Option<f64> {
        self.parity.as_ref().map(|p| p.value)
    }
}

/// Statistical parity and drift auditor
#[derive(Debug, Clone, Default)]
pub struct FairnessAuditor {
    config: AuditorConfig,
}

impl FairnessAuditor {
    pub fn new(config: AuditorConfig) -> FairnessResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AuditorConfig {
        &self.config
    }

    /// Audits a snapshot using the configured attribute and outcome field.
    pub fn run(&self, snapshot: &[DecisionRecord]) -> AuditReport {
        self.run_audit(
            snapshot,
            self.config.sensitive_attribute.as_deref(),
            &self.config.outcome_field,
        )
    }

    /// Audits a snapshot.
    ///
    /// With no `sensitive_attribute`, the first column matching one of
    /// [`SENSITIVE_CANDIDATES`] is used; with none present parity is skipped.
    pub fn run_audit(
        &self,
        snapshot: &[DecisionRecord],
        sensitive_attribute: Option<&str>,
        outcome_field: &str,
    ) -> AuditReport {
        let frame = AuditFrame::from_records(snapshot, outcome_field);
        self.audit_frame(&frame, sensitive_attribute)
    }

    /// Audits a prepared frame.
    pub fn audit_frame(&self, frame: &AuditFrame, sensitive_attribute: Option<&str>) -> AuditReport {
        let mut skipped = Vec::new();
        let mut incidents = Vec::new();

        let attribute = match sensitive_attribute {
            Some(name) => frame.find_column(name).map(str::to_string),
            None => frame
                .columns()
                .iter()
                .find(|c| SENSITIVE_CANDIDATES.iter().any(|s| c.eq_ignore_ascii_case(s)))
                .cloned(),
        };

        let parity = match attribute {
            Some(ref attribute) => {
                let parity = statistical_parity(frame, attribute);
                if parity.is_none() {
                    skipped.push(skip(
                        TestName::StatisticalParity,
                        format!("fewer than two groups for '{}'", attribute),
                    ));
                }
                parity
            }
            None => {
                let reason = match sensitive_attribute {
                    Some(name) => format!("attribute '{}' not present", name),
                    None => "no sensitive attribute present".to_string(),
                };
                skipped.push(skip(TestName::StatisticalParity, reason));
                None
            }
        };

        if let Some(ref parity) = parity {
            if parity.value.abs() > self.config.fairness_threshold {
                incidents.push(raise(
                    TestName::StatisticalParity,
                    parity.value,
                    IncidentSeverity::High,
                ));
            }
        }

        let drift = detect_drift(frame, self.config.drift_bins);
        if drift.columns.is_empty() {
            skipped.push(skip(TestName::Drift, "no column with two distinct values".into()));
        }
        if drift.score > self.config.drift_threshold {
            incidents.push(raise(TestName::Drift, drift.score, IncidentSeverity::Medium));
        }

        AuditReport {
            records: frame.len(),
            sensitive_attribute: attribute,
            parity,
            drift,
            skipped,
            incidents,
        }
    }
}

fn skip(test_name: TestName, reason: String) -> SkippedTest {
    Logger::trace(
        Event::ComputationSkipped.as_str(),
        &[("reason", &reason), ("test", test_name.as_str())],
    );
    SkippedTest { test_name, reason }
}

fn raise(test_name: TestName, value: f64, severity: IncidentSeverity) -> Incident {
    let incident = Incident::new(test_name, value, severity);
    log_event_with_fields(
        Event::IncidentRaised,
        &[
            ("id", &incident.id.to_string()),
            ("severity", severity.as_str()),
            ("test", test_name.as_str()),
            ("value", &value.to_string()),
        ],
    );
    incident
}
