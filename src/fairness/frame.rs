//! Tabular view of a decision snapshot
//!
//! One row per decision: its numeric features plus an outcome label.
//! Columns are listed in order of first appearance across rows.

use crate::decision_log::{DecisionRecord, FeatureMap};
use crate::hashing::format_number;

/// Outcome field that reads the decision label instead of a feature
pub const DECISION_FIELD: &str = "decision";

/// One decision as seen by the auditor
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRow {
    pub features: FeatureMap,
    pub outcome: Option<String>,
}

impl AuditRow {
    pub fn new(features: FeatureMap, outcome: impl Into<String>) -> Self {
        Self {
            features,
            outcome: Some(outcome.into()),
        }
    }
}

/// Audit input built from a snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFrame {
    columns: Vec<String>,
    rows: Vec<AuditRow>,
}

impl AuditFrame {
    pub fn new(rows: Vec<AuditRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.features.keys() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Builds a frame from decision records.
    ///
    /// With `outcome_field == "decision"` the outcome is the decision label;
    /// otherwise it is that feature's value in canonical number form.
    pub fn from_records(records: &[DecisionRecord], outcome_field: &str) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                let outcome = if outcome_field == DECISION_FIELD {
                    Some(record.decision_output().label().to_string())
                } else {
                    record
                        .input_features()
                        .get(outcome_field)
                        .map(|v| format_number(*v))
                };
                AuditRow {
                    features: record.input_features().clone(),
                    outcome,
                }
            })
            .collect();
        Self::new(rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[AuditRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact column name matching `name` case-insensitively.
    pub fn find_column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Non-missing values of one column, in row order.
    pub fn values(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.features.get(column).copied())
            .collect()
    }
}
