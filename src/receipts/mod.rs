//! User-facing decision receipts
//!
//! A receipt explains one logged decision to its subject and is anchored
//! under a Merkle root so any third party can check it was not altered.

mod disclosure;
mod errors;
mod receipt;
mod remediation;
mod service;
mod store;
mod verify;

pub use disclosure::{ConsentRecord, ConsentRegistry, DiscloseAll, DisclosurePolicy, CONSENT_FILE};
pub use errors::{ReceiptError, ReceiptResult};
pub use receipt::{
    Anchor, AnchorBatch, ProofClaim, Receipt, ReceiptProof, VerificationResult, ANCHOR_KEY,
};
pub use remediation::{Comparison, RemediationRule, RemediationTable, FALLBACK, NO_ACTION};
pub use service::{split_reasons, ReceiptService, DEFAULT_ANCHOR_BATCH_SIZE, NO_REASON};
pub use store::{FileReceiptStore, MemberAnchor, MemoryReceiptStore, ReceiptStore, RECEIPTS_FILE};
pub use verify::verify_receipt;
