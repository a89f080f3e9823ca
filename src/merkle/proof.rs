//! Merkle membership proofs
//!
//! A proof is the ordered list of siblings from a leaf up to the root,
//! each tagged with the side the sibling sits on. Verification folds the
//! path starting from `sha256(leaf)` and compares the result with the
//! claimed root.

use serde::{Deserialize, Serialize};

use crate::hashing::digests_equal;

use super::tree::{depth_for, hash_leaf, hash_pair};

/// Which side of the running hash a sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling is the left child; running hash is the right child
    Left,
    /// Sibling is the right child; running hash is the left child
    Right,
}

/// One step of a sibling path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: String,
    pub side: Side,
}

/// Membership proof of one leaf in one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub root: String,
    pub leaf: String,
    pub leaf_index: usize,
    pub batch_size: usize,
    pub path: Vec<ProofStep>,
}

impl MerkleProof {
    /// Checks the proof is well-formed for its declared batch and that it
    /// reconstructs the declared root.
    ///
    /// Well-formed means: the index lies in the batch, the path length is
    /// the tree depth for `batch_size`, and each step's side agrees with
    /// the corresponding bit of `leaf_index`.
    pub fn verify(&self) -> bool {
        if self.batch_size == 0 || self.leaf_index >= self.batch_size {
            return false;
        }
        if self.path.len() != depth_for(self.batch_size) {
            return false;
        }
        let sides_match_index = self.path.iter().enumerate().all(|(level, step)| {
            let is_right_child = (self.leaf_index >> level) & 1 == 1;
            (step.side == Side::Left) == is_right_child
        });
        sides_match_index && verify(self.leaf.as_bytes(), &self.path, &self.root)
    }
}

/// Folds a sibling path from a leaf to the root it implies.
pub fn reconstruct_root(leaf: &[u8], path: &[ProofStep]) -> String {
    path.iter().fold(hash_leaf(leaf), |running, step| match step.side {
        Side::Left => hash_pair(&step.sibling, &running),
        Side::Right => hash_pair(&running, &step.sibling),
    })
}

/// True iff `leaf` with `path` reconstructs `root`.
///
/// With an empty path this degenerates to `sha256(leaf) == root`.
pub fn verify(leaf: &[u8], path: &[ProofStep], root: &str) -> bool {
    digests_equal(&reconstruct_root(leaf, path), root)
}
