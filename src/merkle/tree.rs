//! Binary Merkle tree over an ordered batch of leaves
//!
//! Construction rules:
//!
//! - level 0 holds `sha256(leaf)` for every leaf, in order
//! - a parent is `sha256(left_hex || right_hex)`, hashing the hex text
//! - on an odd level the last node is paired with itself
//! - an empty batch has the root [`EMPTY_ROOT`]
//!
//! A singleton batch therefore has `root == sha256(leaf)`.

use crate::hashing::sha256_hex;

use super::proof::{MerkleProof, ProofStep, Side};

/// Root of an empty batch
pub const EMPTY_ROOT: &str = "";

/// Hashes a leaf value into its level-0 node.
pub fn hash_leaf(leaf: &[u8]) -> String {
    sha256_hex(leaf)
}

/// Hashes two child nodes into their parent.
pub fn hash_pair(left: &str, right: &str) -> String {
    let mut joined = String::with_capacity(left.len() + right.len());
    joined.push_str(left);
    joined.push_str(right);
    sha256_hex(joined.as_bytes())
}

/// Computes the root of an ordered batch without retaining the tree.
pub fn root<L: AsRef<[u8]>>(leaves: &[L]) -> String {
    MerkleTree::build(leaves).root().to_string()
}

/// Number of hashing levels above the leaves for a batch of `batch_size`.
pub fn depth_for(batch_size: usize) -> usize {
    let mut width = batch_size;
    let mut depth = 0;
    while width > 1 {
        width = width.div_ceil(2);
        depth += 1;
    }
    depth
}

/// A fully materialised tree, kept so proofs can be cut for any leaf.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<Vec<u8>>,
    /// `levels[0]` are hashed leaves; the last level holds the root
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Builds the tree for an ordered batch.
    pub fn build<L: AsRef<[u8]>>(leaves: &[L]) -> Self {
        let raw: Vec<Vec<u8>> = leaves.iter().map(|l| l.as_ref().to_vec()).collect();
        if raw.is_empty() {
            return Self {
                leaves: raw,
                levels: Vec::new(),
            };
        }

        let mut levels = vec![raw.iter().map(|l| hash_leaf(l)).collect::<Vec<_>>()];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<String> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [only] => hash_pair(only, only),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Self {
            leaves: raw,
            levels,
        }
    }

    /// The root digest, or [`EMPTY_ROOT`] for an empty batch.
    pub fn root(&self) -> &str {
        self.levels
            .last()
            .and_then(|top| top.first())
            .map(String::as_str)
            .unwrap_or(EMPTY_ROOT)
    }

    /// Number of leaves in the batch
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True for an empty batch
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Cuts the membership proof for the leaf at `index`.
    ///
    /// Returns `None` if `index` is outside the batch.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = self.leaves.get(index)?;

        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_position, side) = if position % 2 == 0 {
                (position + 1, Side::Right)
            } else {
                (position - 1, Side::Left)
            };
            // The unpaired last node is its own sibling
            let sibling = level
                .get(sibling_position)
                .unwrap_or(&level[position])
                .clone();
            path.push(ProofStep { sibling, side });
            position /= 2;
        }

        Some(MerkleProof {
            root: self.root().to_string(),
            leaf: String::from_utf8_lossy(leaf).into_owned(),
            leaf_index: index,
            batch_size: self.leaves.len(),
            path,
        })
    }
}
