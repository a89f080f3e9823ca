//! Statistical parity between two groups
//!
//! Only the first two distinct attribute values observed are compared.
//! Rows of any further group are ignored.

use serde::{Deserialize, Serialize};

use crate::decision_log::is_positive_label;
use crate::hashing::format_number;

use super::frame::AuditFrame;

/// Parity measurement over one sensitive attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParityResult {
    pub attribute: String,
    /// Group keys in observation order
    pub groups: [String; 2],
    /// Positive-outcome rate of each group
    pub rates: [f64; 2],
    /// `rates[0] - rates[1]`
    pub value: f64,
}

/// Computes parity for `attribute`, or `None` when it is undefined.
///
/// Undefined means fewer than two groups among rows that carry both the
/// attribute and an outcome.
pub fn statistical_parity(frame: &AuditFrame, attribute: &str) -> Option<ParityResult> {
    let mut groups: Vec<String> = Vec::with_capacity(2);
    let mut counts = [(0usize, 0usize); 2];

    for row in frame.rows() {
        let (Some(value), Some(outcome)) = (row.features.get(attribute), row.outcome.as_deref())
        else {
            continue;
        };
        let key = format_number(*value);
        let slot = match groups.iter().position(|g| *g == key) {
            Some(slot) => slot,
            None if groups.len() < 2 => {
                groups.push(key);
                groups.len() - 1
            }
            None => continue,
        };
        counts[slot].0 += 1;
        if is_positive_label(outcome) {
            counts[slot].1 += 1;
        }
    }

    if groups.len() < 2 {
        return None;
    }

    let rate = |(total, positive): (usize, usize)| positive as f64 / total as f64;
    let rates = [rate(counts[0]), rate(counts[1])];

    Some(ParityResult {
        attribute: attribute.to_string(),
        groups: [groups[0].clone(), groups[1].clone()],
        rates,
        value: rates[0] - rates[1],
    })
}
