//! Distribution drift against a uniform reference
//!
//! Each numeric column is bucketed into equal-width bins over its observed
//! range and compared with the uniform distribution by KL divergence.
//! Columns with fewer than two values, or a single distinct value, carry
//! no distributional information and are skipped.

use serde::{Deserialize, Serialize};

use super::frame::AuditFrame;

/// Additive smoothing applied to both distributions
pub const KL_EPSILON: f64 = 1e-9;

/// Default number of histogram bins
pub const DEFAULT_BINS: usize = 5;

/// Why a column was left out of the drift score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSkip {
    TooFewValues,
    Constant,
}

/// Drift over every numeric column of a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Mean divergence over scored columns; 0.0 when none were scored
    pub score: f64,
    pub columns: Vec<(String, f64)>,
    pub skipped: Vec<(String, ColumnSkip)>,
}

/// Normalised equal-width histogram of `values` over `[min, max]`.
///
/// The last bin is closed on the right. Fewer than two values or a
/// constant column cannot be binned.
pub fn histogram(values: &[f64], bins: usize) -> Result<Vec<f64>, ColumnSkip> {
    if values.len() < 2 {
        return Err(ColumnSkip::TooFewValues);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return Err(ColumnSkip::Constant);
    }

    let bins = bins.max(1);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for value in values {
        let index = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    let total = values.len() as f64;
    Ok(counts.into_iter().map(|c| c as f64 / total).collect())
}

/// KL(p || q) with [`KL_EPSILON`] added to every probability.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(p, q)| {
            let p = p + KL_EPSILON;
            let q = q + KL_EPSILON;
            p * (p / q).ln()
        })
        .sum()
}

/// Scores every column of `frame` against a uniform reference.
pub fn detect_drift(frame: &AuditFrame, bins: usize) -> DriftResult {
    let bins = bins.max(1);
    let uniform = vec![1.0 / bins as f64; bins];
    let mut columns = Vec::new();
    let mut skipped = Vec::new();

    for column in frame.columns() {
        match histogram(&frame.values(column), bins) {
            Ok(p) => columns.push((column.clone(), kl_divergence(&p, &uniform))),
            Err(reason) => skipped.push((column.clone(), reason)),
        }
    }

    let score = if columns.is_empty() {
        0.0
    } else {
        columns.iter().map(|(_, s)| s).sum::<f64>() / columns.len() as f64
    };

    DriftResult {
        score,
        columns,
        skipped,
    }
}
