//! Receipt Verification Tests
//!
//! - A receipt with its issued proof verifies, also after a JSON round trip
//! - Every member of a multi-receipt batch verifies against the shared root
//! - Tampering with the body, the proof or the anchor fails verification
//! - Malformed anchors never error

use std::sync::Arc;

use fairtrail::decision_log::{
    DecisionLog, DecisionOutput, FeatureMap, MemoryDecisionStore, NewDecision,
};
use fairtrail::hashing::sha256_hex;
use fairtrail::receipts::{
    verify_receipt, ConsentRegistry, MemoryReceiptStore, ProofClaim, Receipt, ReceiptError,
    ReceiptService, FALLBACK, NO_ACTION, NO_REASON,
};
use serde_json::{json, Value};

// =============================================================================
// Test Utilities
// =============================================================================

fn applicant(subject: &str, label: &str, explanation: &str) -> NewDecision {
    let mut input_features = FeatureMap::new();
    input_features.insert("income".into(), 25_000.0);
    input_features.insert("age".into(), 24.0);
    input_features.insert("credit_score".into(), 580.0);
    input_features.insert("spending_ratio".into(), 0.65);
    NewDecision {
        subject_id: subject.to_string(),
        input_features,
        decision_output: DecisionOutput::new(label),
        explanation_text: explanation.to_string(),
        model_version: "demo-v1".into(),
    }
}

fn service_with(decisions: usize) -> ReceiptService {
    let log = DecisionLog::open(Box::new(MemoryDecisionStore::new())).unwrap();
    for i in 0..decisions {
        log.append(applicant(
            &format!("subject-{}", i % 2),
            "denied",
            "Income is low. Spending ratio is high.",
        ))
        .unwrap();
    }
    ReceiptService::new(Arc::new(log), Arc::new(MemoryReceiptStore::new()))
}

fn claim_for(service: &ReceiptService, receipt: &Receipt) -> ProofClaim {
    ProofClaim::from(&service.prove(receipt).unwrap())
}

/// Serialize to text and parse back, as a holder of the receipt would.
fn as_received(receipt: &Receipt) -> Value {
    let text = serde_json::to_string_pretty(receipt).unwrap();
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// Receipt Content
// =============================================================================

#[test]
fn test_receipt_content_for_denied_decision() {
    let service = service_with(1);
    let receipt = service.generate(1).unwrap();

    assert_eq!(receipt.summary, "Decision: denied");
    assert_eq!(receipt.reasons, vec!["Income is low", "Spending ratio is high"]);
    assert_eq!(
        receipt.alternatives,
        vec![
            "Increase credit score to 650",
            "Reduce spending ratio below 40%",
            "Increase income by 10,000",
        ]
    );
    assert_eq!(receipt.used_data.len(), 4);
    assert!(receipt.anchor.is_none());
}

#[test]
fn test_receipt_content_edge_cases() {
    let log = DecisionLog::open(Box::new(MemoryDecisionStore::new())).unwrap();
    log.append(applicant("a", "approved", "  ")).unwrap();
    let mut healthy = applicant("b", "denied", "");
    healthy.input_features.insert("credit_score".into(), 800.0);
    healthy.input_features.insert("spending_ratio".into(), 0.1);
    healthy.input_features.insert("income".into(), 90_000.0);
    log.append(healthy).unwrap();
    let service = ReceiptService::new(Arc::new(log), Arc::new(MemoryReceiptStore::new()));

    let approved = service.generate(1).unwrap();
    assert_eq!(approved.reasons, vec![NO_REASON]);
    assert_eq!(approved.alternatives, vec![NO_ACTION]);

    let denied = service.generate(2).unwrap();
    assert_eq!(denied.alternatives, vec![FALLBACK]);
}

#[test]
fn test_consent_filters_used_data() {
    let log = DecisionLog::open(Box::new(MemoryDecisionStore::new())).unwrap();
    log.append(applicant("alice", "denied", "Low income.")).unwrap();
    let consent = Arc::new(ConsentRegistry::new());
    consent.set("alice", "age", false, None).unwrap();
    let service = ReceiptService::new(Arc::new(log), Arc::new(MemoryReceiptStore::new()))
        .with_disclosure(consent);

    let receipt = service.generate(1).unwrap();
    assert!(!receipt.used_data.contains_key("age"));
    assert_eq!(receipt.used_data.len(), 3);
}

#[test]
fn test_unknown_decision_is_not_found() {
    let service = service_with(1);
    assert!(matches!(
        service.generate(99).unwrap_err(),
        ReceiptError::DecisionNotFound(99)
    ));
}

// =============================================================================
// Verification Round Trip
// =============================================================================

#[test]
fn test_singleton_anchor_verifies() {
    let service = service_with(1);
    let receipt = service.generate_anchored(1).unwrap();
    let anchor = receipt.anchor.clone().unwrap();

    let leaf = receipt.leaf_hash().unwrap();
    assert_eq!(anchor.batch_size, 1);
    assert_eq!(anchor.root, sha256_hex(leaf.as_bytes()));

    let result = service.verify(&as_received(&receipt), Some(&claim_for(&service, &receipt)));
    assert!(result.verified);
    assert!(result.proof_ok);
    assert!(result.merkle_root_ok);
    assert_eq!(result.leaf_hash, leaf);
    assert_eq!(result.recomputed_root, anchor.root);
    assert_eq!(result.receipt_id, Some(receipt.receipt_id.to_string()));
}

#[test]
fn test_every_batch_member_verifies() {
    let service = service_with(6);
    let receipts: Vec<Receipt> = (1..=6).map(|id| service.generate(id).unwrap()).collect();

    let first = service.anchor(&receipts[0]).unwrap();
    let root = first.anchor.as_ref().unwrap().root.clone();

    for original in &receipts {
        let stored = service.get(&original.receipt_id).unwrap();
        let anchor = stored.anchor.as_ref().unwrap();
        assert_eq!(anchor.root, root);
        assert_eq!(anchor.batch_size, 6);

        let result = verify_receipt(&as_received(&stored), Some(&claim_for(&service, &stored)));
        assert!(result.verified, "receipt for decision {}", stored.decision_id);
    }

    let batches = service.batches().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].root, root);
    assert_eq!(batches[0].receipt_ids[0], receipts[0].receipt_id);
}

#[test]
fn test_anchor_is_never_replaced() {
    let service = service_with(2);
    let first = service.generate_anchored(1).unwrap();
    let second = service.generate_anchored(2).unwrap();
    assert_ne!(first.anchor, second.anchor);

    let again = service.anchor(&first).unwrap();
    assert_eq!(again.anchor, first.anchor);
    assert_eq!(service.batches().unwrap().len(), 2);
}

#[test]
fn test_unanchored_receipt_verifies_on_proof_alone() {
    let service = service_with(1);
    let receipt = service.generate(1).unwrap();
    let result = verify_receipt(&as_received(&receipt), Some(&claim_for(&service, &receipt)));
    assert!(result.verified);
    assert!(!result.merkle_root_ok);
    assert!(result.anchor_root.is_none());
}

// =============================================================================
// Tampering
// =============================================================================

#[test]
fn test_tampered_body_fails() {
    let service = service_with(1);
    let receipt = service.generate_anchored(1).unwrap();
    let claim = claim_for(&service, &receipt);

    let mut forged = as_received(&receipt);
    forged["summary"] = json!("Decision: approved");
    let result = verify_receipt(&forged, Some(&claim));
    assert!(!result.verified);
    assert!(!result.proof_ok);
    assert!(!result.merkle_root_ok);
}

#[test]
fn test_missing_or_invalid_proof_fails() {
    let service = service_with(1);
    let receipt = service.generate_anchored(1).unwrap();
    let value = as_received(&receipt);

    assert!(!verify_receipt(&value, None).verified);

    let mut claim = claim_for(&service, &receipt);
    claim.valid = false;
    assert!(!verify_receipt(&value, Some(&claim)).verified);
}

#[test]
fn test_forged_anchor_root_fails() {
    let service = service_with(1);
    let receipt = service.generate_anchored(1).unwrap();
    let claim = claim_for(&service, &receipt);

    let mut forged = as_received(&receipt);
    forged["anchor"]["root"] = json!(sha256_hex(b"another batch"));
    let result = verify_receipt(&forged, Some(&claim));
    assert!(result.proof_ok);
    assert!(!result.merkle_root_ok);
    assert!(!result.verified);
}

#[test]
fn test_malformed_anchor_is_diagnosed_not_raised() {
    let service = service_with(1);
    let receipt = service.generate_anchored(1).unwrap();
    let claim = claim_for(&service, &receipt);

    for anchor in [json!("garbage"), json!({"root": "abc"}), json!({"path": 7})] {
        let mut forged = as_received(&receipt);
        forged["anchor"] = anchor;
        let result = verify_receipt(&forged, Some(&claim));
        assert!(!result.verified);
        assert!(!result.merkle_root_ok);
    }

    let mut partial = as_received(&receipt);
    partial["anchor"] = json!({"root": "abc"});
    assert_eq!(
        verify_receipt(&partial, Some(&claim)).anchor_root.as_deref(),
        Some("abc")
    );
}

#[test]
fn test_non_object_input_does_not_verify() {
    for value in [json!(null), json!([1, 2, 3]), json!("receipt")] {
        assert!(!verify_receipt(&value, None).verified);
    }
}

#[test]
fn test_prove_flags_altered_receipt() {
    let service = service_with(1);
    let receipt = service.generate(1).unwrap();
    let mut altered = receipt.clone();
    altered.alternatives.clear();

    assert!(service.prove(&receipt).unwrap().valid);
    assert!(!service.prove(&altered).unwrap().valid);
}
