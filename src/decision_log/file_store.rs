//! File-backed decision store
//!
//! `<data_dir>/decisions.log` is an append-only journal with one sealed
//! record per line. On load every line's checksum, every record's content
//! hash and the id sequence are re-verified; any mismatch halts the load
//! with a FATAL corruption error instead of skipping the record.
//!
//! A failed append is rolled back by the journal, so `WRITE_FAILED` is safe
//! to retry. If the rollback fails the store reports `UNUSABLE` from then on.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::journal::{AppendFault, Journal, ReadFault};
use crate::observability::{log_event_with_fields, Event};

use super::errors::{LogError, LogResult};
use super::record::DecisionRecord;
use super::store::DecisionStore;

/// File name of the decision journal inside the data directory
pub const DECISIONS_FILE: &str = "decisions.log";

/// Append-only decision journal on disk
#[derive(Debug)]
pub struct FileDecisionStore {
    path: PathBuf,
    journal: Mutex<Journal>,
}

impl FileDecisionStore {
    /// Opens or creates `<data_dir>/decisions.log`.
    ///
    /// # Errors
    ///
    /// `FAIRTRAIL_LOG_IO_ERROR` if the file cannot be created or opened.
    pub fn open(data_dir: &Path) -> LogResult<Self> {
        let path = data_dir.join(DECISIONS_FILE);
        let journal = Journal::open(&path).map_err(|e| {
            LogError::io_error(format!("failed to open {}", path.display()), e)
        })?;
        Ok(Self::with_journal(journal))
    }

    /// Uses an already-open journal.
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            path: journal.path().to_path_buf(),
            journal: Mutex::new(journal),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corruption(line: usize, reason: impl Into<String>) -> LogError {
        let reason = reason.into();
        let line_str = line.to_string();
        log_event_with_fields(
            Event::DecisionLogCorruption,
            &[("line", &line_str), ("reason", &reason)],
        );
        LogError::corruption_at_line(line, reason)
    }
}

impl DecisionStore for FileDecisionStore {
    fn load(&self) -> LogResult<Vec<DecisionRecord>> {
        let journal = self.journal.lock().map_err(|_| LogError::lock_poisoned())?;
        let payloads = journal.read_all().map_err(|fault| match fault {
            ReadFault::Io(e) => LogError::io_error("failed to read decision journal", e),
            ReadFault::Line { line, fault } => Self::corruption(line, fault.describe()),
        })?;

        let mut records = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let line = index + 1;
            let record: DecisionRecord = serde_json::from_str(payload)
                .map_err(|e| Self::corruption(line, format!("undecodable record: {}", e)))?;

            if record.id() != line as u64 {
                return Err(Self::corruption(
                    line,
                    format!("expected decision id {}, found {}", line, record.id()),
                ));
            }
            if !record.verify_content_hash() {
                return Err(Self::corruption(line, "content hash mismatch"));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn persist(&self, record: &DecisionRecord) -> LogResult<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| LogError::write_failed_no_source(format!("encode failed: {}", e)))?;
        let mut journal = self.journal.lock().map_err(|_| LogError::lock_poisoned())?;
        journal.append(&json).map_err(|fault| match fault {
            AppendFault::RolledBack(e) => {
                LogError::write_failed(format!("failed to append decision {}", record.id()), e)
            }
            AppendFault::Unusable(reason) => LogError::unusable(reason),
        })
    }
}
