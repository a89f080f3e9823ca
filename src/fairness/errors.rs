//! # Fairness Errors

use thiserror::Error;

/// Result type for fairness operations
pub type FairnessResult<T> = Result<T, FairnessError>;

/// Fairness auditing errors
///
/// Tests that cannot run on the available data are not errors; they are
/// reported as skipped in the audit report.
#[derive(Debug, Clone, Error)]
pub enum FairnessError {
    #[error("Invalid audit configuration: {0}")]
    InvalidConfig(String),

    #[error("Incident storage error: {0}")]
    Storage(String),

    #[error("Incident store corrupted at line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FairnessError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            FairnessError::InvalidConfig(_) => 400,
            FairnessError::Storage(_) => 503,
            FairnessError::Corruption { .. } => 500,
            FairnessError::Internal(_) => 500,
        }
    }
}
