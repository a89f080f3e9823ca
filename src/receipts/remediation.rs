//! Remediation suggestions for receipts
//!
//! A fixed table of threshold rules evaluated in order. The table is data,
//! so deployments with a different model can supply their own.

use serde::{Deserialize, Serialize};

use crate::decision_log::{DecisionOutput, FeatureMap};

/// Suggestion for positive decisions
pub const NO_ACTION: &str = "No action needed";

/// Suggestion when no rule fires on a negative decision
pub const FALLBACK: &str = "Add a co-signer";

/// Direction of a threshold comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Fires when the feature is strictly below the threshold
    Below,
    /// Fires when the feature is strictly above the threshold
    Above,
}

/// One row of the remediation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationRule {
    pub feature: String,
    pub comparison: Comparison,
    pub threshold: f64,
    pub suggestion: String,
}

impl RemediationRule {
    pub fn new(
        feature: impl Into<String>,
        comparison: Comparison,
        threshold: f64,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature.into(),
            comparison,
            threshold,
            suggestion: suggestion.into(),
        }
    }

    /// True if the feature is present and on the firing side of the threshold.
    pub fn fires(&self, features: &FeatureMap) -> bool {
        match features.get(&self.feature) {
            Some(&value) => match self.comparison {
                Comparison::Below => value < self.threshold,
                Comparison::Above => value > self.threshold,
            },
            None => false,
        }
    }
}

/// Ordered remediation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationTable {
    rules: Vec<RemediationRule>,
}

impl Default for RemediationTable {
    fn default() -> Self {
        Self::new(vec![
            RemediationRule::new(
                "credit_score",
                Comparison::Below,
                650.0,
                "Increase credit score to 650",
            ),
            RemediationRule::new(
                "spending_ratio",
                Comparison::Above,
                0.4,
                "Reduce spending ratio below 40%",
            ),
            RemediationRule::new(
                "income",
                Comparison::Below,
                50000.0,
                "Increase income by 10,000",
            ),
        ])
    }
}

impl RemediationTable {
    pub fn new(rules: Vec<RemediationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RemediationRule] {
        &self.rules
    }

    /// Suggestions for one decision, in table order.
    pub fn suggest(&self, output: &DecisionOutput, features: &FeatureMap) -> Vec<String> {
        if output.is_positive() {
            return vec![NO_ACTION.to_string()];
        }

        let fired: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| rule.fires(features))
            .map(|rule| rule.suggestion.clone())
            .collect();

        if fired.is_empty() {
            vec![FALLBACK.to_string()]
        } else {
            fired
        }
    }
}
