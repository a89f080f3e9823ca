//! # Receipt Service
//!
//! Builds receipts from logged decisions, anchors them in Merkle batches
//! and verifies receipts presented later.
//!
//! Batching policy: a batch starts with the receipt being anchored and is
//! filled with other unanchored receipts in ascending `decision_id` order,
//! up to `anchor_batch_size` leaves. Every member gets the shared root and
//! timestamp plus its own sibling path. The trail entry and all member
//! anchors are stored in one write. Batches are formed one at a time.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::decision_log::{DecisionLog, DecisionRecord, LogErrorCode};
use crate::merkle::MerkleTree;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

use super::disclosure::{DiscloseAll, DisclosurePolicy};
use super::errors::{ReceiptError, ReceiptResult};
use super::receipt::{Anchor, AnchorBatch, ProofClaim, Receipt, ReceiptProof, VerificationResult};
use super::remediation::RemediationTable;
use super::store::{MemberAnchor, ReceiptStore};
use super::verify::verify_receipt;

/// Reason used when an explanation yields no segments
pub const NO_REASON: &str = "Model decision summary not available";

/// Default number of leaves per anchor batch
pub const DEFAULT_ANCHOR_BATCH_SIZE: usize = 32;

/// Splits an explanation into trimmed, non-empty sentences.
pub fn split_reasons(explanation: &str) -> Vec<String> {
    let reasons: Vec<String> = explanation
        .split(|c: char| c == '.' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if reasons.is_empty() {
        vec![NO_REASON.to_string()]
    } else {
        reasons
    }
}

/// Receipt generation, anchoring and verification
#[derive(Debug)]
pub struct ReceiptService {
    log: Arc<DecisionLog>,
    store: Arc<dyn ReceiptStore>,
    disclosure: Arc<dyn DisclosurePolicy>,
    remediation: RemediationTable,
    anchor_batch_size: usize,
    anchor_lock: Mutex<()>,
    metrics: Arc<MetricsRegistry>,
}

impl ReceiptService {
    pub fn new(log: Arc<DecisionLog>, store: Arc<dyn ReceiptStore>) -> Self {
        Self {
            log,
            store,
            disclosure: Arc::new(DiscloseAll),
            remediation: RemediationTable::default(),
            anchor_batch_size: DEFAULT_ANCHOR_BATCH_SIZE,
            anchor_lock: Mutex::new(()),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_disclosure(mut self, disclosure: Arc<dyn DisclosurePolicy>) -> Self {
        self.disclosure = disclosure;
        self
    }

    pub fn with_remediation(mut self, remediation: RemediationTable) -> Self {
        self.remediation = remediation;
        self
    }

    /// Sets the maximum leaves per batch (at least 1).
    pub fn with_anchor_batch_size(mut self, size: usize) -> Self {
        self.anchor_batch_size = size.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the receipt for a decision, creating it on first request.
    ///
    /// # Errors
    ///
    /// `DecisionNotFound` if the id is not in the decision log.
    pub fn generate(&self, decision_id: u64) -> ReceiptResult<Receipt> {
        if let Some(existing) = self.store.find_by_decision(decision_id)? {
            return Ok(existing);
        }

        let record = self.log.get(decision_id).map_err(|e| match e.code() {
            LogErrorCode::NotFound => ReceiptError::DecisionNotFound(decision_id),
            _ => ReceiptError::DecisionLog(e),
        })?;

        let (receipt, inserted) = self.store.insert_if_absent(self.build(&record))?;
        if inserted {
            self.metrics.increment_receipts_generated();
            log_event_with_fields(
                Event::ReceiptGenerated,
                &[
                    ("decision_id", &decision_id.to_string()),
                    ("receipt_id", &receipt.receipt_id.to_string()),
                ],
            );
        }
        Ok(receipt)
    }

    fn build(&self, record: &DecisionRecord) -> Receipt {
        Receipt {
            receipt_id: Uuid::new_v4(),
            decision_id: record.id(),
            subject_id: record.subject_id().to_string(),
            summary: format!("Decision: {}", record.decision_output().label()),
            reasons: split_reasons(record.explanation_text()),
            used_data: self
                .disclosure
                .disclose(record.subject_id(), record.input_features()),
            alternatives: self
                .remediation
                .suggest(record.decision_output(), record.input_features()),
            anchor: None,
            created_at: Utc::now(),
        }
    }

    /// Anchors a stored receipt, batching it with other pending receipts.
    ///
    /// A receipt that already carries an anchor is returned unchanged.
    pub fn anchor(&self, receipt: &Receipt) -> ReceiptResult<Receipt> {
        let _batching = self
            .anchor_lock
            .lock()
            .map_err(|_| ReceiptError::Internal("Lock poisoned".into()))?;

        let current = self
            .store
            .get(&receipt.receipt_id)?
            .ok_or_else(|| ReceiptError::ReceiptNotFound(receipt.receipt_id.to_string()))?;
        if current.is_anchored() {
            return Ok(current);
        }

        let mut members = vec![current];
        members.extend(
            self.store
                .pending(self.anchor_batch_size)?
                .into_iter()
                .filter(|r| r.receipt_id != receipt.receipt_id)
                .take(self.anchor_batch_size - 1),
        );

        let leaves = members
            .iter()
            .map(Receipt::leaf_hash)
            .collect::<ReceiptResult<Vec<String>>>()?;
        let tree = MerkleTree::build(&leaves);
        let batch = AnchorBatch {
            root: tree.root().to_string(),
            batch_timestamp: Utc::now(),
            leaves: leaves.clone(),
            receipt_ids: members.iter().map(|r| r.receipt_id).collect(),
        };

        let anchors = members
            .iter()
            .enumerate()
            .map(|(index, member)| {
                let proof = tree.proof(index).ok_or_else(|| {
                    ReceiptError::Internal(format!("no proof for leaf {}", index))
                })?;
                Ok(MemberAnchor {
                    receipt_id: member.receipt_id,
                    anchor: Anchor {
                        root: batch.root.clone(),
                        batch_timestamp: batch.batch_timestamp,
                        batch_size: leaves.len(),
                        leaf_index: index,
                        path: proof.path,
                    },
                })
            })
            .collect::<ReceiptResult<Vec<MemberAnchor>>>()?;
        let anchored = self.store.anchor_batch(&batch, anchors)?;

        self.metrics.add_receipts_anchored(members.len() as u64);
        self.metrics.increment_anchor_batches();
        log_event_with_fields(
            Event::ReceiptBatchAnchored,
            &[
                ("batch_size", &members.len().to_string()),
                ("root", &batch.root),
            ],
        );

        anchored
            .into_iter()
            .next()
            .ok_or_else(|| ReceiptError::Internal("empty anchor batch".into()))
    }

    /// Generates (or fetches) the receipt for a decision and anchors it.
    pub fn generate_anchored(&self, decision_id: u64) -> ReceiptResult<Receipt> {
        let receipt = self.generate(decision_id)?;
        self.anchor(&receipt)
    }

    /// Issues a hash commitment for a receipt.
    ///
    /// `valid` is true only if the presented receipt matches the stored one.
    pub fn prove(&self, receipt: &Receipt) -> ReceiptResult<ReceiptProof> {
        let stored = self
            .store
            .get(&receipt.receipt_id)?
            .ok_or_else(|| ReceiptError::ReceiptNotFound(receipt.receipt_id.to_string()))?;
        let hash = receipt.leaf_hash()?;
        Ok(ReceiptProof {
            proof_id: Uuid::new_v4(),
            valid: stored.leaf_hash()? == hash,
            hash,
        })
    }

    /// Verifies a receipt as received; never mutates stored state.
    pub fn verify(&self, receipt: &Value, proof: Option<&ProofClaim>) -> VerificationResult {
        let result = verify_receipt(receipt, proof);
        self.metrics.increment_verifications();
        if !result.verified {
            self.metrics.increment_verifications_failed();
        }
        log_event_with_fields(
            Event::ReceiptVerified,
            &[
                ("leaf_hash", &result.leaf_hash),
                ("verified", if result.verified { "true" } else { "false" }),
            ],
        );
        result
    }

    pub fn get(&self, receipt_id: &Uuid) -> ReceiptResult<Receipt> {
        self.store
            .get(receipt_id)?
            .ok_or_else(|| ReceiptError::ReceiptNotFound(receipt_id.to_string()))
    }

    pub fn list_for_subject(&self, subject_id: &str) -> ReceiptResult<Vec<Receipt>> {
        self.store.list_for_subject(subject_id)
    }

    /// The anchor trail, oldest batch first.
    pub fn batches(&self) -> ReceiptResult<Vec<AnchorBatch>> {
        self.store.batches()
    }
}
