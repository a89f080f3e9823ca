//! Decision records
//!
//! A `DecisionRecord` is sealed once: its id and content hash are assigned
//! by the log at write time and there is no way to change any field
//! afterwards. The content hash covers every other field through the
//! canonical JSON encoding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hashing::digest_serializable;

use super::errors::{LogError, LogResult};

/// Ordered feature mapping, name to value
pub type FeatureMap = BTreeMap<String, f64>;

/// Labels counted as a positive outcome, compared case-insensitively
pub const POSITIVE_LABELS: [&str; 4] = ["1", "true", "approved", "yes"];

/// True if `label` is one of [`POSITIVE_LABELS`].
pub fn is_positive_label(label: &str) -> bool {
    let label = label.trim();
    POSITIVE_LABELS
        .iter()
        .any(|positive| positive.eq_ignore_ascii_case(label))
}

/// Outcome produced by the decision-making model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutput {
    /// Outcome label, e.g. `approved` or `denied`
    pub decision: String,
}

impl DecisionOutput {
    pub fn new(decision: impl Into<String>) -> Self {
        Self {
            decision: decision.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.decision
    }

    pub fn is_positive(&self) -> bool {
        is_positive_label(&self.decision)
    }
}

/// A decision as supplied by the intake boundary, before the log seals it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDecision {
    pub subject_id: String,
    pub input_features: FeatureMap,
    pub decision_output: DecisionOutput,
    #[serde(default)]
    pub explanation_text: String,
    pub model_version: String,
}

impl NewDecision {
    /// Checks required fields and feature values.
    ///
    /// # Errors
    ///
    /// `FAIRTRAIL_LOG_VALIDATION` naming the first offending field.
    pub fn validate(&self) -> LogResult<()> {
        if self.subject_id.trim().is_empty() {
            return Err(LogError::validation("subject_id must not be empty"));
        }
        if self.model_version.trim().is_empty() {
            return Err(LogError::validation("model_version must not be empty"));
        }
        if self.decision_output.decision.trim().is_empty() {
            return Err(LogError::validation("decision_output.decision must not be empty"));
        }
        for (name, value) in &self.input_features {
            if name.trim().is_empty() {
                return Err(LogError::validation("feature names must not be empty"));
            }
            if !value.is_finite() {
                return Err(LogError::validation(format!(
                    "feature '{}' must be a finite number",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// An immutable, content-hashed decision record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    id: u64,
    subject_id: String,
    input_features: FeatureMap,
    decision_output: DecisionOutput,
    explanation_text: String,
    model_version: String,
    created_at: DateTime<Utc>,
    content_hash: String,
}

/// The hashed view of a record: every field except the hash itself
#[derive(Serialize)]
struct HashedFields<'a> {
    id: u64,
    subject_id: &'a str,
    input_features: &'a FeatureMap,
    decision_output: &'a DecisionOutput,
    explanation_text: &'a str,
    model_version: &'a str,
    created_at: &'a DateTime<Utc>,
}

impl DecisionRecord {
    /// Assigns id and timestamp to a validated decision and computes its hash.
    pub(crate) fn seal(id: u64, decision: NewDecision, created_at: DateTime<Utc>) -> LogResult<Self> {
        let mut record = Self {
            id,
            subject_id: decision.subject_id,
            input_features: decision.input_features,
            decision_output: decision.decision_output,
            explanation_text: decision.explanation_text,
            model_version: decision.model_version,
            created_at,
            content_hash: String::new(),
        };
        record.content_hash = record.compute_content_hash()?;
        Ok(record)
    }

    /// Recomputes the content hash from the record's fields.
    pub fn compute_content_hash(&self) -> LogResult<String> {
        let fields = HashedFields {
            id: self.id,
            subject_id: &self.subject_id,
            input_features: &self.input_features,
            decision_output: &self.decision_output,
            explanation_text: &self.explanation_text,
            model_version: &self.model_version,
            created_at: &self.created_at,
        };
        digest_serializable(&fields).map_err(|e| LogError::validation(e.to_string()))
    }

    /// True if the stored content hash matches the fields.
    pub fn verify_content_hash(&self) -> bool {
        self.compute_content_hash()
            .map(|h| h == self.content_hash)
            .unwrap_or(false)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn input_features(&self) -> &FeatureMap {
        &self.input_features
    }

    pub fn decision_output(&self) -> &DecisionOutput {
        &self.decision_output
    }

    pub fn explanation_text(&self) -> &str {
        &self.explanation_text
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

#[cfg(test)]
pub(crate) fn sample_decision(subject: &str, decision: &str) -> NewDecision {
    let mut features = FeatureMap::new();
    features.insert("income".into(), 25000.0);
    features.insert("age".into(), 24.0);
    features.insert("credit_score".into(), 580.0);
    features.insert("spending_ratio".into(), 0.65);
    NewDecision {
        subject_id: subject.into(),
        input_features: features,
        decision_output: DecisionOutput::new(decision),
        explanation_text: "Income is low. Spending ratio is high.".into(),
        model_version: "demo-v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_labels() {
        assert!(is_positive_label("approved"));
        assert!(is_positive_label("APPROVED"));
        assert!(is_positive_label(" Yes "));
        assert!(is_positive_label("1"));
        assert!(is_positive_label("True"));
        assert!(!is_positive_label("denied"));
        assert!(!is_positive_label("0"));
        assert!(!is_positive_label(""));
    }

    #[test]
    fn test_validation_rejects_missing_fields() {
        let mut d = sample_decision("", "approved");
        assert!(d.validate().is_err());

        d.subject_id = "u-1".into();
        d.model_version = " ".into();
        assert!(d.validate().is_err());

        d.model_version = "v1".into();
        d.decision_output = DecisionOutput::new("");
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_finite_features() {
        let mut d = sample_decision("u-1", "denied");
        d.input_features.insert("income".into(), f64::INFINITY);
        let err = d.validate().unwrap_err();
        assert!(err.message().contains("income"));
    }

    #[test]
    fn test_seal_computes_verifiable_hash() {
        let record = DecisionRecord::seal(1, sample_decision("u-1", "denied"), Utc::now()).unwrap();
        assert_eq!(record.content_hash().len(), 64);
        assert!(record.verify_content_hash());
    }

    #[test]
    fn test_tampering_breaks_hash() {
        let record = DecisionRecord::seal(1, sample_decision("u-1", "denied"), Utc::now()).unwrap();
        let mut json = serde_json::to_value(&record).unwrap();
        json["decision_output"]["decision"] = "approved".into();
        let tampered: DecisionRecord = serde_json::from_value(json).unwrap();
        assert!(!tampered.verify_content_hash());
    }

    #[test]
    fn test_hash_survives_serde_round_trip() {
        let record = DecisionRecord::seal(9, sample_decision("u-2", "approved"), Utc::now()).unwrap();
        let line = serde_json::to_string(&record).unwrap();
        let back: DecisionRecord = serde_json::from_str(&line).unwrap();
        assert!(back.verify_content_hash());
        assert_eq!(back, record);
    }
}
