//! Merkle Proof Tests
//!
//! - Roots are deterministic and order-sensitive
//! - A singleton root is sha256 of the leaf text
//! - Every leaf of every batch size proves membership; tampering fails

use fairtrail::hashing::{digest, sha256_hex};
use fairtrail::merkle::{
    depth_for, hash_pair, reconstruct_root, root, verify, MerkleTree, Side, EMPTY_ROOT,
};

fn leaves(n: usize) -> Vec<String> {
    (0..n).map(|i| digest(format!("receipt-{}", i).as_str())).collect()
}

#[test]
fn test_root_is_deterministic() {
    let batch = leaves(7);
    assert_eq!(root(&batch), root(&batch.clone()));
}

#[test]
fn test_reordering_changes_root() {
    let batch = leaves(4);
    let mut swapped = batch.clone();
    swapped.swap(1, 2);
    assert_ne!(root(&batch), root(&swapped));
}

#[test]
fn test_singleton_root_is_hash_of_leaf() {
    let leaf = digest("only receipt");
    assert_eq!(root(&[leaf.clone()]), sha256_hex(leaf.as_bytes()));
}

#[test]
fn test_empty_batch_root() {
    let empty: Vec<String> = Vec::new();
    assert_eq!(root(&empty), EMPTY_ROOT);
    assert!(MerkleTree::build(&empty).proof(0).is_none());
}

#[test]
fn test_odd_level_pairs_last_node_with_itself() {
    let batch = leaves(3);
    let h: Vec<String> = batch.iter().map(|l| sha256_hex(l.as_bytes())).collect();
    let expected = hash_pair(&hash_pair(&h[0], &h[1]), &hash_pair(&h[2], &h[2]));
    assert_eq!(root(&batch), expected);
}

#[test]
fn test_every_leaf_proves_for_batch_sizes_1_to_17() {
    for size in 1..=17 {
        let batch = leaves(size);
        let tree = MerkleTree::build(&batch);
        for index in 0..size {
            let proof = tree.proof(index).unwrap();
            assert_eq!(proof.path.len(), depth_for(size));
            assert!(proof.verify(), "size {} index {}", size, index);
            assert_eq!(reconstruct_root(batch[index].as_bytes(), &proof.path), tree.root());
        }
    }
}

#[test]
fn test_proof_for_other_leaf_fails() {
    let batch = leaves(8);
    let tree = MerkleTree::build(&batch);
    let proof = tree.proof(3).unwrap();
    assert!(!verify(batch[4].as_bytes(), &proof.path, tree.root()));
}

#[test]
fn test_tampered_sibling_fails() {
    let batch = leaves(5);
    let tree = MerkleTree::build(&batch);
    let mut proof = tree.proof(2).unwrap();
    proof.path[0].sibling = digest("forged");
    assert!(!proof.verify());
}

#[test]
fn test_flipped_side_fails() {
    let batch = leaves(4);
    let tree = MerkleTree::build(&batch);
    let mut proof = tree.proof(0).unwrap();
    proof.path[0].side = Side::Left;
    assert!(!proof.verify());
}

#[test]
fn test_wrong_batch_size_fails() {
    let batch = leaves(4);
    let tree = MerkleTree::build(&batch);
    let mut proof = tree.proof(1).unwrap();
    proof.batch_size = 9;
    assert!(!proof.verify());
}
