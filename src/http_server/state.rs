//! Shared handler state

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;
use crate::counterfactual::{CounterfactualSearch, DecisionRule, LinearCreditRule};
use crate::decision_log::{DecisionLog, FileDecisionStore, LogError, MemoryDecisionStore};
use crate::fairness::{FairnessAuditor, FairnessError, FileIncidentStore, IncidentStore, MemoryIncidentStore};
use crate::observability::MetricsRegistry;
use crate::receipts::{
    ConsentRegistry, FileReceiptStore, MemoryReceiptStore, ReceiptError, ReceiptService,
    ReceiptStore,
};
use crate::scheduler::AuditJob;

use super::errors::ApiError;

/// Failure to assemble the services behind the API
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to create data directory: {0}")]
    DataDir(#[from] std::io::Error),

    #[error("Decision log: {0}")]
    DecisionLog(#[from] LogError),

    #[error("Receipt store: {0}")]
    Receipts(#[from] ReceiptError),

    #[error("Auditor: {0}")]
    Fairness(#[from] FairnessError),
}

/// Everything the handlers share
#[derive(Debug, Clone)]
pub struct AppState {
    pub log: Arc<DecisionLog>,
    pub receipts: Arc<ReceiptService>,
    pub consent: Arc<ConsentRegistry>,
    pub incidents: Arc<dyn IncidentStore>,
    pub audit: Arc<AuditJob>,
    pub search: Arc<CounterfactualSearch>,
    pub rule: Arc<dyn DecisionRule>,
    pub metrics: Arc<MetricsRegistry>,
    pub storage_timeout: Duration,
}

impl AppState {
    /// Opens the file-backed stores under `config.data_dir`.
    pub fn open(config: &Config, metrics: Arc<MetricsRegistry>) -> Result<Self, StateError> {
        let data_dir = config.data_path();
        fs::create_dir_all(data_dir)?;

        let log = DecisionLog::open(Box::new(FileDecisionStore::open(data_dir)?))?
            .with_retry(config.retry_policy())
            .with_metrics(metrics.clone());
        let receipts: Arc<dyn ReceiptStore> = Arc::new(FileReceiptStore::open(data_dir)?);
        let incidents: Arc<dyn IncidentStore> = Arc::new(FileIncidentStore::open(data_dir)?);
        let consent = Arc::new(ConsentRegistry::open(data_dir)?);

        Self::assemble(config, Arc::new(log), receipts, consent, incidents, metrics)
    }

    /// Same wiring as [`AppState::open`] over in-memory stores.
    pub fn in_memory(config: &Config) -> Result<Self, StateError> {
        let metrics = Arc::new(MetricsRegistry::new());
        let log = DecisionLog::open(Box::new(MemoryDecisionStore::new()))?
            .with_retry(config.retry_policy())
            .with_metrics(metrics.clone());

        Self::assemble(
            config,
            Arc::new(log),
            Arc::new(MemoryReceiptStore::new()),
            Arc::new(ConsentRegistry::new()),
            Arc::new(MemoryIncidentStore::new()),
            metrics,
        )
    }

    fn assemble(
        config: &Config,
        log: Arc<DecisionLog>,
        receipt_store: Arc<dyn ReceiptStore>,
        consent: Arc<ConsentRegistry>,
        incidents: Arc<dyn IncidentStore>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, StateError> {
        let receipts = ReceiptService::new(log.clone(), receipt_store)
            .with_disclosure(consent.clone())
            .with_anchor_batch_size(config.receipts.anchor_batch_size)
            .with_metrics(metrics.clone());
        let auditor = FairnessAuditor::new(config.auditor_config())?;
        let audit = AuditJob::new(log.clone(), auditor, incidents.clone())
            .with_metrics(metrics.clone());

        Ok(Self {
            log,
            receipts: Arc::new(receipts),
            consent,
            incidents,
            audit: Arc::new(audit),
            search: Arc::new(CounterfactualSearch::default()),
            rule: Arc::new(LinearCreditRule::default()),
            metrics,
            storage_timeout: config.storage_timeout(),
        })
    }

    /// Runs a storage call off the async workers, bounded by the storage
    /// timeout. A call that overruns keeps running to completion; only the
    /// response gives up on it.
    pub async fn blocking<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.storage_timeout, tokio::task::spawn_blocking(op)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ApiError::internal(format!("storage task failed: {}", e))),
            Err(_) => Err(ApiError::storage_timeout(self.storage_timeout)),
        }
    }
}
