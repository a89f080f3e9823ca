//! Decision functions the search can query

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decision_log::FeatureMap;

/// A deterministic decision function
pub trait DecisionRule: Send + Sync {
    fn decide(&self, input: &FeatureMap) -> String;
}

impl<F> DecisionRule for F
where
    F: Fn(&FeatureMap) -> String + Send + Sync,
{
    fn decide(&self, input: &FeatureMap) -> String {
        self(input)
    }
}

impl fmt::Debug for dyn DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DecisionRule")
    }
}

/// Linear credit score used by the demo model
///
/// `0.4 * income / 100000 + 0.3 * credit_score / 900 - 0.3 * spending_ratio`,
/// approved above `threshold`. Missing features count as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCreditRule {
    pub threshold: f64,
}

impl Default for LinearCreditRule {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl LinearCreditRule {
    pub fn score(&self, input: &FeatureMap) -> f64 {
        let get = |name: &str| input.get(name).copied().unwrap_or(0.0);
        0.4 * (get("income") / 100_000.0) + 0.3 * (get("credit_score") / 900.0)
            - 0.3 * get("spending_ratio")
    }
}

impl DecisionRule for LinearCreditRule {
    fn decide(&self, input: &FeatureMap) -> String {
        if self.score(input) > self.threshold {
            "approved".to_string()
        } else {
            "denied".to_string()
        }
    }
}
