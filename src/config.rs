//! # Configuration
//!
//! A single JSON file, `fairtrail.json` by default. Only `data_dir` is
//! required; every other field has a default. The file is validated once
//! after parsing and a bad value stops startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fairness::{AuditorConfig, DECISION_FIELD, DEFAULT_BINS};
use crate::observability::Severity;
use crate::receipts::DEFAULT_ANCHOR_BATCH_SIZE;
use crate::retry::RetryPolicy;

/// Default config path used by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "./fairtrail.json";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the decision log, receipts and incidents
    pub data_dir: PathBuf,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub receipts: ReceiptsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Event log settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Lowest severity written: trace, info, warn, error or fatal
    #[serde(default)]
    pub level: Severity,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Audit thresholds and schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_fairness_threshold")]
    pub fairness_threshold: f64,

    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,

    #[serde(default = "default_drift_bins")]
    pub drift_bins: usize,

    /// When unset, the first of region/gender/race present is used
    #[serde(default)]
    pub sensitive_attribute: Option<String>,

    #[serde(default = "default_outcome_field")]
    pub outcome_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptsConfig {
    #[serde(default = "default_anchor_batch_size")]
    pub anchor_batch_size: usize,
}

/// Storage call bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upper bound on one storage call made on behalf of a request
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_interval_secs() -> u64 {
    1800
} // 30 minutes
fn default_fairness_threshold() -> f64 {
    0.1
}
fn default_drift_threshold() -> f64 {
    0.5
}
fn default_drift_bins() -> usize {
    DEFAULT_BINS
}
fn default_outcome_field() -> String {
    DECISION_FIELD.to_string()
}
fn default_anchor_batch_size() -> usize {
    DEFAULT_ANCHOR_BATCH_SIZE
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    50
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fairness_threshold: default_fairness_threshold(),
            drift_threshold: default_drift_threshold(),
            drift_bins: default_drift_bins(),
            sensitive_attribute: None,
            outcome_field: default_outcome_field(),
        }
    }
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            anchor_batch_size: default_anchor_batch_size(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Config {
    /// Config with defaults for everything except the data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            http: HttpConfig::default(),
            audit: AuditConfig::default(),
            receipts: ReceiptsConfig::default(),
            storage: StorageConfig::default(),
            log: LogConfig::default(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if self.audit.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "audit.interval_secs must be > 0".into(),
            ));
        }
        if self.receipts.anchor_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "receipts.anchor_batch_size must be >= 1".into(),
            ));
        }
        if self.storage.timeout_ms == 0 {
            return Err(ConfigError::Invalid("storage.timeout_ms must be > 0".into()));
        }
        if self.storage.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "storage.retry_attempts must be >= 1".into(),
            ));
        }
        self.auditor_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("audit: {}", e)))
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    /// `host:port` for the HTTP listener
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }

    pub fn audit_period(&self) -> Duration {
        Duration::from_secs(self.audit.interval_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.timeout_ms)
    }

    pub fn auditor_config(&self) -> AuditorConfig {
        AuditorConfig {
            fairness_threshold: self.audit.fairness_threshold,
            drift_threshold: self.audit.drift_threshold,
            drift_bins: self.audit.drift_bins,
            sensitive_attribute: self.audit.sensitive_attribute.clone(),
            outcome_field: self.audit.outcome_field.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.storage.retry_attempts,
            initial_backoff: Duration::from_millis(self.storage.retry_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}
