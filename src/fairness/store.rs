//! # Incident Store
//!
//! Append-only. Incidents are never deduplicated: repeated detections
//! across runs form a time series.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::journal::{AppendFault, Journal, ReadFault};

use super::errors::{FairnessError, FairnessResult};
use super::incident::Incident;

/// File name of the incident journal inside the data directory
pub const INCIDENTS_FILE: &str = "incidents.log";

/// Durable incident storage
pub trait IncidentStore: Send + Sync + Debug {
    /// Durably appends one incident.
    fn append(&self, incident: &Incident) -> FairnessResult<()>;

    /// Every incident, oldest first.
    fn list(&self) -> FairnessResult<Vec<Incident>>;
}

/// In-memory incident store
#[derive(Debug, Default)]
pub struct MemoryIncidentStore {
    incidents: Mutex<Vec<Incident>>,
}

impl MemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IncidentStore for MemoryIncidentStore {
    fn append(&self, incident: &Incident) -> FairnessResult<()> {
        self.incidents
            .lock()
            .map_err(|_| FairnessError::Internal("Lock poisoned".into()))?
            .push(incident.clone());
        Ok(())
    }

    fn list(&self) -> FairnessResult<Vec<Incident>> {
        self.incidents
            .lock()
            .map(|incidents| incidents.clone())
            .map_err(|_| FairnessError::Internal("Lock poisoned".into()))
    }
}

/// Incident journal on disk, one checksummed JSON line per incident
#[derive(Debug)]
pub struct FileIncidentStore {
    path: PathBuf,
    journal: Mutex<Journal>,
}

impl FileIncidentStore {
    pub fn open(data_dir: &Path) -> FairnessResult<Self> {
        let path = data_dir.join(INCIDENTS_FILE);
        let journal = Journal::open(&path).map_err(|e| {
            FairnessError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self::with_journal(journal))
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            path: journal.path().to_path_buf(),
            journal: Mutex::new(journal),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IncidentStore for FileIncidentStore {
    fn append(&self, incident: &Incident) -> FairnessResult<()> {
        let json = serde_json::to_string(incident)
            .map_err(|e| FairnessError::Internal(format!("Failed to serialize incident: {}", e)))?;
        self.journal
            .lock()
            .map_err(|_| FairnessError::Internal("Lock poisoned".into()))?
            .append(&json)
            .map_err(|fault| match fault {
                AppendFault::RolledBack(e) => {
                    FairnessError::Storage(format!("Failed to append incident: {}", e))
                }
                AppendFault::Unusable(reason) => FairnessError::Internal(format!(
                    "Incident journal unusable: {}",
                    reason
                )),
            })
    }

    fn list(&self) -> FairnessResult<Vec<Incident>> {
        let journal = self
            .journal
            .lock()
            .map_err(|_| FairnessError::Internal("Lock poisoned".into()))?;
        let payloads = journal.read_all().map_err(|fault| match fault {
            ReadFault::Io(e) => FairnessError::Storage(format!("Failed to read incidents: {}", e)),
            ReadFault::Line { line, fault } => FairnessError::Corruption {
                line,
                reason: fault.describe().to_string(),
            },
        })?;

        payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| {
                serde_json::from_str(payload).map_err(|e| FairnessError::Corruption {
                    line: index + 1,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::incident::{IncidentSeverity, TestName};
    use crate::journal::faulty::{FaultyFile, Faults};
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_keeps_duplicates() {
        let store = MemoryIncidentStore::new();
        let incident = Incident::new(TestName::Drift, 0.7, IncidentSeverity::Medium);
        store.append(&incident).unwrap();
        store.append(&incident).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let first = Incident::new(TestName::StatisticalParity, -0.3, IncidentSeverity::High);
        {
            let store = FileIncidentStore::open(dir.path()).unwrap();
            store.append(&first).unwrap();
            store
                .append(&Incident::new(TestName::Drift, 0.8, IncidentSeverity::Medium))
                .unwrap();
        }

        let listed = FileIncidentStore::open(dir.path()).unwrap().list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], first);
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let dir = TempDir::new().unwrap();
        let store = FileIncidentStore::open(dir.path()).unwrap();
        store
            .append(&Incident::new(TestName::Drift, 0.8, IncidentSeverity::Medium))
            .unwrap();
        let mut raw = OpenOptions::new().append(true).open(store.path()).unwrap();
        raw.write_all(b"00000000 {}\n").unwrap();

        match store.list() {
            Err(FairnessError::Corruption { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_torn_incident_append_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let faults = Arc::new(Faults::default());
        let journal = FaultyFile::journal(&dir.path().join(INCIDENTS_FILE), faults.clone());
        let store = FileIncidentStore::with_journal(journal);
        let incident = Incident::new(TestName::Drift, 0.8, IncidentSeverity::Medium);
        store.append(&incident).unwrap();

        faults.tear_writes.store(1, Ordering::SeqCst);
        assert!(matches!(
            store.append(&incident),
            Err(FairnessError::Storage(_))
        ));
        faults.fail_syncs.store(1, Ordering::SeqCst);
        assert!(matches!(
            store.append(&incident),
            Err(FairnessError::Storage(_))
        ));
        store.append(&incident).unwrap();

        assert_eq!(FileIncidentStore::open(dir.path()).unwrap().list().unwrap().len(), 2);
    }

    #[test]
    fn test_incident_journal_unusable_after_failed_rollback() {
        let dir = TempDir::new().unwrap();
        let faults = Arc::new(Faults::default());
        let journal = FaultyFile::journal(&dir.path().join(INCIDENTS_FILE), faults.clone());
        let store = FileIncidentStore::with_journal(journal);
        let incident = Incident::new(TestName::Drift, 0.8, IncidentSeverity::Medium);

        faults.fail_syncs.store(1, Ordering::SeqCst);
        faults.fail_truncates.store(1, Ordering::SeqCst);
        assert!(matches!(
            store.append(&incident),
            Err(FairnessError::Internal(_))
        ));
        assert!(matches!(
            store.append(&incident),
            Err(FairnessError::Internal(_))
        ));
    }
}
