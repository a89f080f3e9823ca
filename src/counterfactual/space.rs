//! Search space: which deltas to try for which feature, and in what order

use serde::{Deserialize, Serialize};

/// Valid range of a feature after a delta is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Negative results are floored at 0
    NonNegative,
    /// Results `<= 0` are replaced by the given positive value
    PositiveOr(f64),
}

impl Domain {
    pub fn clamp(&self, value: f64) -> f64 {
        match *self {
            Domain::NonNegative => value.max(0.0),
            Domain::PositiveOr(floor) => {
                if value <= 0.0 {
                    floor
                } else {
                    value
                }
            }
        }
    }
}

/// Ordered deltas for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAxis {
    pub name: String,
    pub deltas: Vec<f64>,
    pub domain: Domain,
}

impl FeatureAxis {
    pub fn new(name: impl Into<String>, deltas: Vec<f64>, domain: Domain) -> Self {
        Self {
            name: name.into(),
            deltas,
            domain,
        }
    }

    /// `start, start + step, ...` strictly below `end`.
    pub fn stepped(name: impl Into<String>, start: i64, end: i64, step: i64, domain: Domain) -> Self {
        let deltas = (0..)
            .map(|i| start + i * step)
            .take_while(|d| *d < end)
            .map(|d| d as f64)
            .collect();
        Self::new(name, deltas, domain)
    }
}

/// Ordered list of axes; features are searched in this order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    axes: Vec<FeatureAxis>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new(vec![
            FeatureAxis::stepped("income", 0, 300_000, 5_000, Domain::NonNegative),
            FeatureAxis::stepped("credit_score", -200, 400, 20, Domain::NonNegative),
            FeatureAxis::new(
                "spending_ratio",
                vec![-0.7, -0.6, -0.5, -0.4, -0.3, -0.2, -0.1],
                Domain::PositiveOr(0.01),
            ),
            FeatureAxis::stepped("age", -5, 15, 2, Domain::NonNegative),
        ])
    }
}

impl SearchSpace {
    pub fn new(axes: Vec<FeatureAxis>) -> Self {
        Self { axes }
    }

    pub fn axes(&self) -> &[FeatureAxis] {
        &self.axes
    }
}
