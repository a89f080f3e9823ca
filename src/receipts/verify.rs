//! Receipt verification
//!
//! Works on the receipt exactly as the verifier received it, as raw JSON.
//! Nothing here touches stored state and nothing here fails: adversarial
//! or malformed input yields `verified = false` with diagnostics.

use serde_json::Value;

use crate::hashing::{digest, digests_equal};
use crate::merkle::{hash_leaf, reconstruct_root};

use super::receipt::{Anchor, ProofClaim, VerificationResult, ANCHOR_KEY};

/// Verifies a receipt and an optional proof claim.
///
/// - `leaf_hash` is the digest of the receipt with its `anchor` key removed
/// - `proof_ok` holds when a claim is supplied, is marked valid and its
///   hash equals `leaf_hash`
/// - `merkle_root_ok` holds when the anchor is well-formed for its batch
///   and its sibling path reconstructs its root
/// - `verified` is `proof_ok && merkle_root_ok` for an anchored receipt,
///   `proof_ok` otherwise
pub fn verify_receipt(receipt: &Value, proof: Option<&ProofClaim>) -> VerificationResult {
    let mut stripped = receipt.clone();
    let anchor_value = match stripped {
        Value::Object(ref mut map) => map.remove(ANCHOR_KEY),
        _ => None,
    };
    let leaf_hash = digest(&stripped);

    let proof_ok = proof
        .map(|claim| claim.valid && digests_equal(&claim.hash, &leaf_hash))
        .unwrap_or(false);

    let receipt_id = receipt
        .get("receipt_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let (merkle_root_ok, recomputed_root, anchor_root, anchored) = match anchor_value {
        None | Some(Value::Null) => (false, hash_leaf(leaf_hash.as_bytes()), None, false),
        Some(raw) => {
            let claimed_root = raw.get("root").and_then(Value::as_str).map(str::to_string);
            match serde_json::from_value::<Anchor>(raw) {
                Ok(anchor) => {
                    let recomputed = reconstruct_root(leaf_hash.as_bytes(), &anchor.path);
                    let ok = anchor.to_proof(&leaf_hash).verify();
                    (ok, recomputed, Some(anchor.root), true)
                }
                Err(_) => (false, hash_leaf(leaf_hash.as_bytes()), claimed_root, true),
            }
        }
    };

    let verified = if anchored {
        proof_ok && merkle_root_ok
    } else {
        proof_ok
    };

    VerificationResult {
        verified,
        leaf_hash,
        proof_ok,
        merkle_root_ok,
        recomputed_root,
        anchor_root,
        receipt_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipts::receipt::sample_receipt;
    use serde_json::json;

    fn claim(hash: &str) -> ProofClaim {
        ProofClaim {
            hash: hash.to_string(),
            valid: true,
        }
    }

    #[test]
    fn test_unanchored_receipt_verifies_on_proof_alone() {
        let receipt = sample_receipt(1);
        let leaf = receipt.leaf_hash().unwrap();
        let json = serde_json::to_value(&receipt).unwrap();

        let result = verify_receipt(&json, Some(&claim(&leaf)));
        assert!(result.verified);
        assert!(result.proof_ok);
        assert!(!result.merkle_root_ok);
        assert_eq!(result.recomputed_root, hash_leaf(leaf.as_bytes()));
    }

    #[test]
    fn test_missing_proof_is_not_verified() {
        let json = serde_json::to_value(sample_receipt(1)).unwrap();
        assert!(!verify_receipt(&json, None).verified);
    }

    #[test]
    fn test_claim_marked_invalid_fails() {
        let receipt = sample_receipt(1);
        let json = serde_json::to_value(&receipt).unwrap();
        let claim = ProofClaim {
            hash: receipt.leaf_hash().unwrap(),
            valid: false,
        };
        assert!(!verify_receipt(&json, Some(&claim)).proof_ok);
    }

    #[test]
    fn test_malformed_anchor_is_reported_not_raised() {
        let receipt = sample_receipt(1);
        let leaf = receipt.leaf_hash().unwrap();
        let mut json = serde_json::to_value(&receipt).unwrap();
        json["anchor"] = json!({"root": "deadbeef", "batch_size": "three"});

        let result = verify_receipt(&json, Some(&claim(&leaf)));
        assert!(!result.verified);
        assert!(result.proof_ok);
        assert!(!result.merkle_root_ok);
        assert_eq!(result.anchor_root.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn test_non_object_input_does_not_panic() {
        let result = verify_receipt(&json!([1, 2, 3]), Some(&claim("00")));
        assert!(!result.verified);
        assert!(result.receipt_id.is_none());
    }
}
