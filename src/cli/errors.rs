//! CLI failures and the process exit status each one maps to

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

use crate::config::ConfigError;
use crate::http_server::StateError;
use crate::scheduler::AuditJobError;

/// Stable identifier of a failure kind, printed before the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    IoError,
    AlreadyInitialized,
    NotInitialized,
    BootFailed,
    AuditBusy,
    AuditFailed,
    VerificationFailed,
}

impl CliErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "FAIRTRAIL_CLI_CONFIG_ERROR",
            Self::IoError => "FAIRTRAIL_CLI_IO_ERROR",
            Self::AlreadyInitialized => "FAIRTRAIL_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "FAIRTRAIL_CLI_NOT_INITIALIZED",
            Self::BootFailed => "FAIRTRAIL_CLI_BOOT_FAILED",
            Self::AuditBusy => "FAIRTRAIL_CLI_AUDIT_BUSY",
            Self::AuditFailed => "FAIRTRAIL_CLI_AUDIT_FAILED",
            Self::VerificationFailed => "FAIRTRAIL_CLI_VERIFICATION_FAILED",
        }
    }

    /// Exit status, following the BSD sysexits conventions
    pub fn exit_status(&self) -> u8 {
        match self {
            // A receipt that does not verify is an answer, not a malfunction
            Self::VerificationFailed => 1,
            Self::NotInitialized => 66,
            Self::AuditFailed => 70,
            Self::AlreadyInitialized => 73,
            Self::IoError => 74,
            Self::AuditBusy => 75,
            Self::BootFailed => 69,
            Self::ConfigError => 78,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Io(String),

    #[error("data directory {0} is already initialized")]
    AlreadyInitialized(PathBuf),

    #[error("data directory {0} is not initialized; run 'fairtrail init' first")]
    NotInitialized(PathBuf),

    #[error("stores could not be opened: {0}")]
    Stores(#[from] StateError),

    #[error("{0}")]
    Boot(String),

    #[error("audit did not run: {0}")]
    Audit(#[from] AuditJobError),

    #[error("receipt did not verify")]
    NotVerified,
}

impl CliError {
    pub fn code(&self) -> CliErrorCode {
        match self {
            CliError::Config(_) | CliError::DataDir { .. } => CliErrorCode::ConfigError,
            CliError::Io(_) => CliErrorCode::IoError,
            CliError::AlreadyInitialized(_) => CliErrorCode::AlreadyInitialized,
            CliError::NotInitialized(_) => CliErrorCode::NotInitialized,
            CliError::Stores(_) | CliError::Boot(_) => CliErrorCode::BootFailed,
            CliError::Audit(AuditJobError::Busy) => CliErrorCode::AuditBusy,
            CliError::Audit(_) => CliErrorCode::AuditFailed,
            CliError::NotVerified => CliErrorCode::VerificationFailed,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code().exit_status())
    }

    /// `CODE: message`, the line printed on stderr
    pub fn report(&self) -> String {
        format!("{}: {}", self.code().as_str(), self)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::FairnessError;

    #[test]
    fn test_busy_audit_is_a_temporary_failure() {
        let busy = CliError::from(AuditJobError::Busy);
        assert_eq!(busy.code(), CliErrorCode::AuditBusy);
        assert_eq!(busy.code().exit_status(), 75);

        let failed = CliError::from(AuditJobError::Incidents(FairnessError::Storage("disk".into())));
        assert_eq!(failed.code(), CliErrorCode::AuditFailed);
        assert!(failed.report().starts_with("FAIRTRAIL_CLI_AUDIT_FAILED: audit did not run"));
    }

    #[test]
    fn test_every_failure_exits_non_zero() {
        let errors = [
            CliError::Io("empty input".into()),
            CliError::AlreadyInitialized("d".into()),
            CliError::NotInitialized("d".into()),
            CliError::Boot("port in use".into()),
            CliError::NotVerified,
        ];
        for error in &errors {
            assert_ne!(error.code().exit_status(), 0, "{}", error.report());
        }
        assert!(errors[2].to_string().contains("fairtrail init"));
    }
}
