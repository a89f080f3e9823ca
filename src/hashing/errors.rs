//! # Hashing Errors

use thiserror::Error;

/// Result type for hashing operations
pub type HashingResult<T> = Result<T, HashingError>;

/// Hashing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashingError {
    #[error("Value has no canonical JSON form: {0}")]
    NotRepresentable(String),
}
