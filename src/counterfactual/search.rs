//! Greedy per-feature counterfactual search
//!
//! Each axis is searched on its own against a copy of the original input.
//! The first delta, in the axis' order, whose clamped result changes the
//! outcome is reported and the axis is abandoned. Results are neither
//! jointly minimal nor unique across features.

use serde::{Deserialize, Serialize};

use crate::decision_log::FeatureMap;

use super::errors::{CounterfactualError, SearchResult};
use super::rule::DecisionRule;
use super::space::SearchSpace;

/// One outcome-flipping single-feature change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualResult {
    pub changed_feature: String,
    pub delta: f64,
    pub new_input: FeatureMap,
    pub new_output: String,
}

/// Counterfactual search over a fixed space
#[derive(Debug, Clone, Default)]
pub struct CounterfactualSearch {
    space: SearchSpace,
}

impl CounterfactualSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Runs the search.
    ///
    /// Axes whose feature is absent from `original` are skipped.
    ///
    /// # Errors
    ///
    /// `Validation` if any input value is not finite.
    pub fn search(
        &self,
        original: &FeatureMap,
        rule: &dyn DecisionRule,
    ) -> SearchResult<Vec<CounterfactualResult>> {
        if let Some((name, _)) = original.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CounterfactualError::Validation(format!(
                "feature '{}' must be a finite number",
                name
            )));
        }

        let baseline = rule.decide(original);
        let mut results = Vec::new();

        for axis in self.space.axes() {
            let Some(&value) = original.get(&axis.name) else {
                continue;
            };
            for &delta in &axis.deltas {
                let mut candidate = original.clone();
                candidate.insert(axis.name.clone(), axis.domain.clamp(value + delta));
                let outcome = rule.decide(&candidate);
                if outcome != baseline {
                    results.push(CounterfactualResult {
                        changed_feature: axis.name.clone(),
                        delta,
                        new_input: candidate,
                        new_output: outcome,
                    });
                    break;
                }
            }
        }

        Ok(results)
    }
}

/// Searches the default space.
pub fn search(
    original: &FeatureMap,
    rule: &dyn DecisionRule,
) -> SearchResult<Vec<CounterfactualResult>> {
    CounterfactualSearch::default().search(original, rule)
}
