//! # Receipt Errors

use thiserror::Error;

use crate::decision_log::{LogError, LogErrorCode};
use crate::hashing::HashingError;

/// Result type for receipt operations
pub type ReceiptResult<T> = Result<T, ReceiptError>;

/// Receipt errors
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Decision not found: {0}")]
    DecisionNotFound(u64),

    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    #[error("Decision log error: {0}")]
    DecisionLog(#[from] LogError),

    #[error("Receipt could not be hashed: {0}")]
    Hashing(#[from] HashingError),

    #[error("Receipt already anchored: {0}")]
    AlreadyAnchored(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Receipt journal corrupt at line {line}: {reason}")]
    Corruption { line: usize, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReceiptError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ReceiptError::DecisionNotFound(_) => 404,
            ReceiptError::ReceiptNotFound(_) => 404,
            ReceiptError::DecisionLog(e) => match e.code() {
                LogErrorCode::NotFound => 404,
                LogErrorCode::Validation => 400,
                LogErrorCode::IoError | LogErrorCode::WriteFailed => 503,
                LogErrorCode::Corruption | LogErrorCode::Unusable | LogErrorCode::Internal => 500,
            },
            ReceiptError::Hashing(_) => 400,
            ReceiptError::AlreadyAnchored(_) => 409,
            ReceiptError::Storage(_) => 503,
            ReceiptError::Corruption { .. } => 500,
            ReceiptError::Internal(_) => 500,
        }
    }

    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        match self {
            ReceiptError::Storage(_) => true,
            ReceiptError::DecisionLog(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ReceiptError::DecisionNotFound(7).status_code(), 404);
        assert_eq!(ReceiptError::Storage("disk".into()).status_code(), 503);
        assert_eq!(ReceiptError::AlreadyAnchored("r".into()).status_code(), 409);
        let corrupt = ReceiptError::Corruption {
            line: 3,
            reason: "checksum mismatch".into(),
        };
        assert_eq!(corrupt.status_code(), 500);
        assert!(corrupt.to_string().contains("line 3"));
        assert_eq!(
            ReceiptError::DecisionLog(LogError::corruption("crc")).status_code(),
            500
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ReceiptError::Storage("disk".into()).is_retryable());
        assert!(!ReceiptError::DecisionNotFound(1).is_retryable());
        assert!(!ReceiptError::DecisionLog(LogError::corruption("crc")).is_retryable());
    }
}
