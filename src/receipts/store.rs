//! # Receipt Store
//!
//! Receipts are keyed by `receipt_id` with a unique index on
//! `decision_id`. Uniqueness is enforced inside `insert_if_absent` under
//! the same lock that guards the write, never by a separate read.
//!
//! The file store is an append-only journal of two entry kinds: a receipt
//! being issued, and an anchor batch together with every member's anchor.
//! One anchoring is one journal line, so the trail never lists a receipt
//! that did not receive the batch's anchor. State is rebuilt by replaying
//! the journal on open; each entry is persisted before it is applied.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::journal::{AppendFault, Journal, ReadFault};

use super::errors::{ReceiptError, ReceiptResult};
use super::receipt::{Anchor, AnchorBatch, Receipt};

/// File name of the receipt journal inside the data directory
pub const RECEIPTS_FILE: &str = "receipts.log";

/// The anchor assigned to one member of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAnchor {
    pub receipt_id: Uuid,
    pub anchor: Anchor,
}

/// Durable receipt storage
pub trait ReceiptStore: Send + Sync + Debug {
    /// Stores `receipt` unless one already exists for its decision.
    ///
    /// Returns the stored receipt and whether this call inserted it.
    fn insert_if_absent(&self, receipt: Receipt) -> ReceiptResult<(Receipt, bool)>;

    /// Looks up a receipt by id.
    fn get(&self, receipt_id: &Uuid) -> ReceiptResult<Option<Receipt>>;

    /// Looks up the receipt for a decision.
    fn find_by_decision(&self, decision_id: u64) -> ReceiptResult<Option<Receipt>>;

    /// Records `batch` on the anchor trail and sets every member's anchor,
    /// as one write.
    ///
    /// Nothing is stored if any member is unknown, listed twice or already
    /// anchored; anchors are never replaced. Returns the updated members in
    /// the order given.
    fn anchor_batch(
        &self,
        batch: &AnchorBatch,
        anchors: Vec<MemberAnchor>,
    ) -> ReceiptResult<Vec<Receipt>>;

    /// Up to `limit` unanchored receipts in ascending `decision_id` order.
    fn pending(&self, limit: usize) -> ReceiptResult<Vec<Receipt>>;

    /// Every receipt issued to a subject, in `decision_id` order.
    fn list_for_subject(&self, subject_id: &str) -> ReceiptResult<Vec<Receipt>>;

    /// The anchor trail, oldest first.
    fn batches(&self) -> ReceiptResult<Vec<AnchorBatch>>;
}

/// One line of the receipt journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum ReceiptEntry {
    Issued {
        receipt: Receipt,
    },
    Anchored {
        batch: AnchorBatch,
        anchors: Vec<MemberAnchor>,
    },
}

/// Receipts plus lookup indexes
#[derive(Debug, Default)]
struct ReceiptState {
    receipts: Vec<Receipt>,
    by_id: HashMap<Uuid, usize>,
    by_decision: HashMap<u64, usize>,
    by_subject: HashMap<String, Vec<usize>>,
    /// Unanchored receipts keyed by decision id
    unanchored: BTreeMap<u64, usize>,
    batches: Vec<AnchorBatch>,
}

impl ReceiptState {
    fn replay(payloads: &[String]) -> ReceiptResult<Self> {
        let mut state = Self::default();
        for (index, payload) in payloads.iter().enumerate() {
            let corrupt = |reason: String| ReceiptError::Corruption {
                line: index + 1,
                reason,
            };
            let entry: ReceiptEntry = serde_json::from_str(payload)
                .map_err(|e| corrupt(format!("undecodable entry: {}", e)))?;
            match entry {
                ReceiptEntry::Issued { receipt } => {
                    if state.existing(&receipt).is_some() {
                        return Err(corrupt(format!(
                            "receipt {} issued twice",
                            receipt.receipt_id
                        )));
                    }
                    state.issue(receipt);
                }
                ReceiptEntry::Anchored { batch, anchors } => {
                    state
                        .check_anchors(&anchors)
                        .map_err(|e| corrupt(e.to_string()))?;
                    state.apply_anchors(batch, anchors);
                }
            }
        }
        Ok(state)
    }

    /// The receipt already occupying this receipt's id or decision
    fn existing(&self, receipt: &Receipt) -> Option<&Receipt> {
        self.by_decision
            .get(&receipt.decision_id)
            .or_else(|| self.by_id.get(&receipt.receipt_id))
            .map(|&index| &self.receipts[index])
    }

    fn issue(&mut self, receipt: Receipt) {
        let index = self.receipts.len();
        self.by_id.insert(receipt.receipt_id, index);
        self.by_decision.insert(receipt.decision_id, index);
        self.by_subject
            .entry(receipt.subject_id.clone())
            .or_default()
            .push(index);
        if receipt.anchor.is_none() {
            self.unanchored.insert(receipt.decision_id, index);
        }
        self.receipts.push(receipt);
    }

    fn check_anchors(&self, anchors: &[MemberAnchor]) -> ReceiptResult<()> {
        if anchors.is_empty() {
            return Err(ReceiptError::Internal("empty anchor batch".into()));
        }
        let mut seen = HashSet::with_capacity(anchors.len());
        for member in anchors {
            let id = member.receipt_id;
            let index = *self
                .by_id
                .get(&id)
                .ok_or_else(|| ReceiptError::ReceiptNotFound(id.to_string()))?;
            if !seen.insert(id) || self.receipts[index].is_anchored() {
                return Err(ReceiptError::AlreadyAnchored(id.to_string()));
            }
        }
        Ok(())
    }

    /// Applies a batch that passed `check_anchors`.
    fn apply_anchors(&mut self, batch: AnchorBatch, anchors: Vec<MemberAnchor>) -> Vec<Receipt> {
        let mut updated = Vec::with_capacity(anchors.len());
        for member in anchors {
            if let Some(&index) = self.by_id.get(&member.receipt_id) {
                let receipt = &mut self.receipts[index];
                self.unanchored.remove(&receipt.decision_id);
                receipt.anchor = Some(member.anchor);
                updated.push(receipt.clone());
            }
        }
        self.batches.push(batch);
        updated
    }

    fn get(&self, receipt_id: &Uuid) -> Option<Receipt> {
        self.by_id
            .get(receipt_id)
            .map(|&index| self.receipts[index].clone())
    }

    fn find_by_decision(&self, decision_id: u64) -> Option<Receipt> {
        self.by_decision
            .get(&decision_id)
            .map(|&index| self.receipts[index].clone())
    }

    fn pending(&self, limit: usize) -> Vec<Receipt> {
        self.unanchored
            .values()
            .take(limit)
            .map(|&index| self.receipts[index].clone())
            .collect()
    }

    fn list_for_subject(&self, subject_id: &str) -> Vec<Receipt> {
        let mut receipts: Vec<Receipt> = self
            .by_subject
            .get(subject_id)
            .map(|indexes| indexes.iter().map(|&i| self.receipts[i].clone()).collect())
            .unwrap_or_default();
        receipts.sort_by_key(|r| r.decision_id);
        receipts
    }
}

fn lock(state: &Mutex<ReceiptState>) -> ReceiptResult<MutexGuard<'_, ReceiptState>> {
    state
        .lock()
        .map_err(|_| ReceiptError::Internal("Lock poisoned".into()))
}

/// In-memory receipt store
#[derive(Debug, Default)]
pub struct MemoryReceiptStore {
    state: Mutex<ReceiptState>,
}

impl MemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReceiptStore for MemoryReceiptStore {
    fn insert_if_absent(&self, receipt: Receipt) -> ReceiptResult<(Receipt, bool)> {
        let mut state = lock(&self.state)?;
        if let Some(existing) = state.existing(&receipt) {
            return Ok((existing.clone(), false));
        }
        state.issue(receipt.clone());
        Ok((receipt, true))
    }

    fn get(&self, receipt_id: &Uuid) -> ReceiptResult<Option<Receipt>> {
        Ok(lock(&self.state)?.get(receipt_id))
    }

    fn find_by_decision(&self, decision_id: u64) -> ReceiptResult<Option<Receipt>> {
        Ok(lock(&self.state)?.find_by_decision(decision_id))
    }

    fn anchor_batch(
        &self,
        batch: &AnchorBatch,
        anchors: Vec<MemberAnchor>,
    ) -> ReceiptResult<Vec<Receipt>> {
        let mut state = lock(&self.state)?;
        state.check_anchors(&anchors)?;
        Ok(state.apply_anchors(batch.clone(), anchors))
    }

    fn pending(&self, limit: usize) -> ReceiptResult<Vec<Receipt>> {
        Ok(lock(&self.state)?.pending(limit))
    }

    fn list_for_subject(&self, subject_id: &str) -> ReceiptResult<Vec<Receipt>> {
        Ok(lock(&self.state)?.list_for_subject(subject_id))
    }

    fn batches(&self) -> ReceiptResult<Vec<AnchorBatch>> {
        Ok(lock(&self.state)?.batches.clone())
    }
}

/// Journal-backed receipt store
#[derive(Debug)]
pub struct FileReceiptStore {
    path: PathBuf,
    state: Mutex<ReceiptState>,
    journal: Mutex<Journal>,
}

impl FileReceiptStore {
    /// Opens or creates `<data_dir>/receipts.log` and replays it.
    ///
    /// # Errors
    ///
    /// `Corruption` with the 1-based line of the first entry that fails its
    /// checksum, does not decode, or contradicts earlier entries.
    pub fn open(data_dir: &Path) -> ReceiptResult<Self> {
        let path = data_dir.join(RECEIPTS_FILE);
        let journal = Journal::open(&path).map_err(|e| {
            ReceiptError::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::with_journal(journal)
    }

    /// Replays and then appends to an already-open journal.
    pub fn with_journal(journal: Journal) -> ReceiptResult<Self> {
        let payloads = journal.read_all().map_err(|fault| match fault {
            ReadFault::Io(e) => ReceiptError::Storage(format!("Failed to read receipts: {}", e)),
            ReadFault::Line { line, fault } => ReceiptError::Corruption {
                line,
                reason: fault.describe().to_string(),
            },
        })?;
        let state = ReceiptState::replay(&payloads)?;

        Ok(Self {
            path: journal.path().to_path_buf(),
            state: Mutex::new(state),
            journal: Mutex::new(journal),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably appends one entry. Callers hold the state lock.
    fn persist(&self, entry: &ReceiptEntry) -> ReceiptResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| ReceiptError::Internal(format!("Failed to serialize receipt entry: {}", e)))?;
        self.journal
            .lock()
            .map_err(|_| ReceiptError::Internal("Lock poisoned".into()))?
            .append(&json)
            .map_err(|fault| match fault {
                AppendFault::RolledBack(e) => {
                    ReceiptError::Storage(format!("Failed to append receipt entry: {}", e))
                }
                AppendFault::Unusable(reason) => {
                    ReceiptError::Internal(format!("Receipt journal unusable: {}", reason))
                }
            })
    }
}

impl ReceiptStore for FileReceiptStore {
    fn insert_if_absent(&self, receipt: Receipt) -> ReceiptResult<(Receipt, bool)> {
        let mut state = lock(&self.state)?;
        if let Some(existing) = state.existing(&receipt) {
            return Ok((existing.clone(), false));
        }
        self.persist(&ReceiptEntry::Issued {
            receipt: receipt.clone(),
        })?;
        state.issue(receipt.clone());
        Ok((receipt, true))
    }

    fn get(&self, receipt_id: &Uuid) -> ReceiptResult<Option<Receipt>> {
        Ok(lock(&self.state)?.get(receipt_id))
    }

    fn find_by_decision(&self, decision_id: u64) -> ReceiptResult<Option<Receipt>> {
        Ok(lock(&self.state)?.find_by_decision(decision_id))
    }

    fn anchor_batch(
        &self,
        batch: &AnchorBatch,
        anchors: Vec<MemberAnchor>,
    ) -> ReceiptResult<Vec<Receipt>> {
        let mut state = lock(&self.state)?;
        state.check_anchors(&anchors)?;
        self.persist(&ReceiptEntry::Anchored {
            batch: batch.clone(),
            anchors: anchors.clone(),
        })?;
        Ok(state.apply_anchors(batch.clone(), anchors))
    }

    fn pending(&self, limit: usize) -> ReceiptResult<Vec<Receipt>> {
        Ok(lock(&self.state)?.pending(limit))
    }

    fn list_for_subject(&self, subject_id: &str) -> ReceiptResult<Vec<Receipt>> {
        Ok(lock(&self.state)?.list_for_subject(subject_id))
    }

    fn batches(&self) -> ReceiptResult<Vec<AnchorBatch>> {
        Ok(lock(&self.state)?.batches.clone())
    }
}
