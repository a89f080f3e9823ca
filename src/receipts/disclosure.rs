//! Which input features a receipt may disclose
//!
//! The receipt service only asks a [`DisclosurePolicy`], per subject and
//! feature, whether a value may be shown. [`ConsentRegistry`] answers from
//! the subjects' recorded choices, optionally persisted to a journal.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision_log::FeatureMap;
use crate::journal::{AppendFault, Journal, ReadFault};

use super::errors::{ReceiptError, ReceiptResult};

/// File name of the consent journal inside the data directory
pub const CONSENT_FILE: &str = "consent.log";

/// Disclosure decision for receipt `used_data`
pub trait DisclosurePolicy: Send + Sync + Debug {
    /// True if `feature` may be shown to `subject_id`.
    fn may_disclose(&self, subject_id: &str, feature: &str) -> bool;

    /// Filters `features` down to the disclosable subset.
    fn disclose(&self, subject_id: &str, features: &FeatureMap) -> FeatureMap {
        features
            .iter()
            .filter(|(name, _)| self.may_disclose(subject_id, name))
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }
}

/// Discloses every feature
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscloseAll;

impl DisclosurePolicy for DiscloseAll {
    fn may_disclose(&self, _subject_id: &str, _feature: &str) -> bool {
        true
    }
}

/// One recorded choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub subject_id: String,
    pub feature: String,
    pub allowed: bool,
    /// The choice stops applying at this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ConsentRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Debug, Default)]
struct ConsentState {
    /// Every record in the order it was made
    history: Vec<ConsentRecord>,
    /// Latest record per (subject, feature)
    latest: HashMap<(String, String), usize>,
}

impl ConsentState {
    fn apply(&mut self, record: ConsentRecord) {
        let key = (record.subject_id.clone(), record.feature.clone());
        self.latest.insert(key, self.history.len());
        self.history.push(record);
    }
}

/// Per-subject, per-feature disclosure choices; the latest one wins.
///
/// Features with no recorded choice, or whose latest choice has expired,
/// are disclosed.
#[derive(Debug, Default)]
pub struct ConsentRegistry {
    state: RwLock<ConsentState>,
    journal: Option<Mutex<Journal>>,
}

impl ConsentRegistry {
    /// A registry that keeps choices in memory only
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens or creates `<data_dir>/consent.log` and replays it.
    pub fn open(data_dir: &Path) -> ReceiptResult<Self> {
        let path = data_dir.join(CONSENT_FILE);
        let journal = Journal::open(&path).map_err(|e| {
            ReceiptError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::with_journal(journal)
    }

    pub fn with_journal(journal: Journal) -> ReceiptResult<Self> {
        let payloads = journal.read_all().map_err(|fault| match fault {
            ReadFault::Io(e) => ReceiptError::Storage(format!("Failed to read consent: {}", e)),
            ReadFault::Line { line, fault } => ReceiptError::Corruption {
                line,
                reason: fault.describe().to_string(),
            },
        })?;

        let mut state = ConsentState::default();
        for (index, payload) in payloads.iter().enumerate() {
            let record: ConsentRecord =
                serde_json::from_str(payload).map_err(|e| ReceiptError::Corruption {
                    line: index + 1,
                    reason: format!("undecodable consent record: {}", e),
                })?;
            state.apply(record);
        }

        Ok(Self {
            state: RwLock::new(state),
            journal: Some(Mutex::new(journal)),
        })
    }

    /// Records the subject's current choice for one feature.
    ///
    /// The record is durable before it takes effect.
    pub fn set(
        &self,
        subject_id: &str,
        feature: &str,
        allowed: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> ReceiptResult<ConsentRecord> {
        let record = ConsentRecord {
            subject_id: subject_id.to_string(),
            feature: feature.to_string(),
            allowed,
            expiry,
            updated_at: Utc::now(),
        };

        let mut state = self
            .state
            .write()
            .map_err(|_| ReceiptError::Internal("Lock poisoned".into()))?;
        if let Some(journal) = &self.journal {
            let json = serde_json::to_string(&record).map_err(|e| {
                ReceiptError::Internal(format!("Failed to serialize consent: {}", e))
            })?;
            journal
                .lock()
                .map_err(|_| ReceiptError::Internal("Lock poisoned".into()))?
                .append(&json)
                .map_err(|fault| match fault {
                    AppendFault::RolledBack(e) => {
                        ReceiptError::Storage(format!("Failed to append consent: {}", e))
                    }
                    AppendFault::Unusable(reason) => {
                        ReceiptError::Internal(format!("Consent journal unusable: {}", reason))
                    }
                })?;
        }
        state.apply(record.clone());
        Ok(record)
    }

    /// Every choice a subject has made, newest first.
    pub fn for_subject(&self, subject_id: &str) -> ReceiptResult<Vec<ConsentRecord>> {
        let state = self
            .state
            .read()
            .map_err(|_| ReceiptError::Internal("Lock poisoned".into()))?;
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect())
    }

    /// Whether `feature` may be shown to `subject_id` at `now`.
    pub fn may_disclose_at(&self, subject_id: &str, feature: &str, now: DateTime<Utc>) -> bool {
        // Fail closed if the lock is poisoned
        let Ok(state) = self.state.read() else {
            return false;
        };
        state
            .latest
            .get(&(subject_id.to_string(), feature.to_string()))
            .map(|&index| &state.history[index])
            .filter(|record| !record.is_expired_at(now))
            .map_or(true, |record| record.allowed)
    }
}

impl DisclosurePolicy for ConsentRegistry {
    fn may_disclose(&self, subject_id: &str, feature: &str) -> bool {
        self.may_disclose_at(subject_id, feature, Utc::now())
    }
}
