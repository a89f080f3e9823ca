//! # Counterfactual Errors

use thiserror::Error;

/// Result type for counterfactual search
pub type SearchResult<T> = Result<T, CounterfactualError>;

/// Counterfactual search errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CounterfactualError {
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl CounterfactualError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            CounterfactualError::Validation(_) => 400,
        }
    }
}
