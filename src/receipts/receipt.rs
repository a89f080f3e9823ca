//! Receipt data model
//!
//! The leaf of a receipt is the digest of its canonical JSON with the
//! `anchor` key removed. Anything a verifier needs is in the serialized
//! form, so a receipt can be checked without access to this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::decision_log::FeatureMap;
use crate::hashing::{digest, HashingError};
use crate::merkle::{MerkleProof, ProofStep};

use super::errors::ReceiptResult;

/// JSON key holding the anchor; excluded from the leaf
pub const ANCHOR_KEY: &str = "anchor";

/// Binds a receipt to one Merkle batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub root: String,
    pub batch_timestamp: DateTime<Utc>,
    pub batch_size: usize,
    pub leaf_index: usize,
    pub path: Vec<ProofStep>,
}

impl Anchor {
    /// The membership proof this anchor asserts for `leaf_hash`.
    pub fn to_proof(&self, leaf_hash: &str) -> MerkleProof {
        MerkleProof {
            root: self.root.clone(),
            leaf: leaf_hash.to_string(),
            leaf_index: self.leaf_index,
            batch_size: self.batch_size,
            path: self.path.clone(),
        }
    }
}

/// User-facing record of one decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: Uuid,
    pub decision_id: u64,
    pub subject_id: String,
    pub summary: String,
    pub reasons: Vec<String>,
    pub used_data: FeatureMap,
    pub alternatives: Vec<String>,
    pub anchor: Option<Anchor>,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// The receipt as JSON with the anchor removed.
    pub fn unanchored_json(&self) -> ReceiptResult<Value> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| HashingError::NotRepresentable(e.to_string()))?;
        if let Value::Object(ref mut map) = value {
            map.remove(ANCHOR_KEY);
        }
        Ok(value)
    }

    /// Digest of the anchor-stripped canonical form.
    pub fn leaf_hash(&self) -> ReceiptResult<String> {
        Ok(digest(&self.unanchored_json()?))
    }
}

/// Commitment issued for a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptProof {
    pub proof_id: Uuid,
    pub valid: bool,
    pub hash: String,
}

/// Proof as presented by a verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofClaim {
    pub hash: String,
    #[serde(default)]
    pub valid: bool,
}

impl From<&ReceiptProof> for ProofClaim {
    fn from(proof: &ReceiptProof) -> Self {
        Self {
            hash: proof.hash.clone(),
            valid: proof.valid,
        }
    }
}

/// Outcome of verifying a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub leaf_hash: String,
    pub proof_ok: bool,
    pub merkle_root_ok: bool,
    pub recomputed_root: String,
    /// Root the receipt claims, if it carried a readable anchor
    pub anchor_root: Option<String>,
    pub receipt_id: Option<String>,
}

/// One entry of the anchor trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorBatch {
    pub root: String,
    pub batch_timestamp: DateTime<Utc>,
    pub leaves: Vec<String>,
    pub receipt_ids: Vec<Uuid>,
}

#[cfg(test)]
pub(crate) fn sample_receipt(decision_id: u64) -> Receipt {
    let mut used_data = FeatureMap::new();
    used_data.insert("income".into(), 25000.0);
    used_data.insert("credit_score".into(), 580.0);
    Receipt {
        receipt_id: Uuid::new_v4(),
        decision_id,
        subject_id: "u-1".into(),
        summary: "Decision: denied".into(),
        reasons: vec!["Income is low".into()],
        used_data,
        alternatives: vec!["Increase credit score to 650".into()],
        anchor: None,
        created_at: Utc::now(),
    }
}
