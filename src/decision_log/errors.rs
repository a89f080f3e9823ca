//! Decision log error types
//!
//! Error codes:
//! - FAIRTRAIL_LOG_VALIDATION (ERROR) - malformed decision at intake
//! - FAIRTRAIL_LOG_NOT_FOUND (ERROR) - unknown decision id
//! - FAIRTRAIL_LOG_IO_ERROR (ERROR, transient) - disk I/O failure
//! - FAIRTRAIL_LOG_WRITE_FAILED (ERROR, transient) - append failed
//! - FAIRTRAIL_LOG_CORRUPTION (FATAL) - checksum or content hash mismatch
//! - FAIRTRAIL_LOG_UNUSABLE (FATAL) - a failed append could not be rolled back
//! - FAIRTRAIL_LOG_INTERNAL (ERROR) - poisoned lock

use std::fmt;
use std::io;

/// Severity levels for decision log errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, service continues
    Error,
    /// The audit trail cannot be trusted; the process must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Decision log error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogErrorCode {
    /// Decision failed intake validation
    Validation,
    /// No record with the requested id
    NotFound,
    /// Disk I/O failure
    IoError,
    /// Append failed
    WriteFailed,
    /// A stored record does not match its checksum or content hash
    Corruption,
    /// The journal tail is unknown after a failed rollback
    Unusable,
    /// Internal invariant broken (poisoned lock)
    Internal,
}

impl LogErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            LogErrorCode::Validation => "FAIRTRAIL_LOG_VALIDATION",
            LogErrorCode::NotFound => "FAIRTRAIL_LOG_NOT_FOUND",
            LogErrorCode::IoError => "FAIRTRAIL_LOG_IO_ERROR",
            LogErrorCode::WriteFailed => "FAIRTRAIL_LOG_WRITE_FAILED",
            LogErrorCode::Corruption => "FAIRTRAIL_LOG_CORRUPTION",
            LogErrorCode::Unusable => "FAIRTRAIL_LOG_UNUSABLE",
            LogErrorCode::Internal => "FAIRTRAIL_LOG_INTERNAL",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            LogErrorCode::Corruption | LogErrorCode::Unusable => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LogErrorCode::IoError | LogErrorCode::WriteFailed)
    }
}

impl fmt::Display for LogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Decision log error with context
#[derive(Debug)]
pub struct LogError {
    code: LogErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl LogError {
    fn new(code: LogErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Malformed decision at intake
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(LogErrorCode::Validation, message)
    }

    /// Unknown decision id
    pub fn not_found(id: u64) -> Self {
        Self {
            details: Some(format!("decision_id: {}", id)),
            ..Self::new(LogErrorCode::NotFound, "decision not found")
        }
    }

    /// Disk I/O failure
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(LogErrorCode::IoError, message)
        }
    }

    /// Append failed
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(LogErrorCode::WriteFailed, message)
        }
    }

    /// Append failed without an underlying I/O error
    pub fn write_failed_no_source(message: impl Into<String>) -> Self {
        Self::new(LogErrorCode::WriteFailed, message)
    }

    /// Stored data does not verify
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(LogErrorCode::Corruption, message)
    }

    /// Stored data does not verify, at a known line of the log file
    pub fn corruption_at_line(line: usize, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("line: {}", line)),
            ..Self::new(LogErrorCode::Corruption, reason)
        }
    }

    /// The journal refuses appends until reopened
    pub fn unusable(message: impl Into<String>) -> Self {
        Self::new(LogErrorCode::Unusable, message)
    }

    /// Poisoned lock
    pub fn lock_poisoned() -> Self {
        Self::new(LogErrorCode::Internal, "lock poisoned")
    }

    /// Returns the error code
    pub fn code(&self) -> LogErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }

    /// Whether the process must stop
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for decision log operations
pub type LogResult<T> = Result<T, LogError>;
