//! Merkle anchoring
//!
//! Pure functions over ordered batches of leaves. Batch composition is the
//! caller's decision; nothing here is persisted.

mod proof;
mod tree;

pub use proof::{reconstruct_root, verify, MerkleProof, ProofStep, Side};
pub use tree::{depth_for, hash_leaf, hash_pair, root, MerkleTree, EMPTY_ROOT};
