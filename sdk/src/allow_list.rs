//! Allow list Merkle trees and proof verification
//!
//! Leaves are the keccak hash of a wallet's base58 address string, as the
//! candy guard program computes them. Parents hash the sorted
//! pair of their children, so proofs carry no left/right flags. A node
//! without a sibling moves up a layer unchanged.

use solana_sdk::{keccak, pubkey::Pubkey};
use std::collections::HashMap;

/// Decides whether the evaluating wallet is proven against an allow list root.
///
/// `label` is the guard group label, `"default"` for the default group.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, merkle_root: &[u8; 32], label: &str) -> bool;
}

impl<F> ProofVerifier for F
where
    F: Fn(&[u8; 32], &str) -> bool + Send + Sync,
{
    fn verify(&self, merkle_root: &[u8; 32], label: &str) -> bool {
        self(merkle_root, label)
    }
}

/// Leaf hash of an address (keccak of its base58 string)
pub fn leaf(address: &Pubkey) -> [u8; 32] {
    keccak::hashv(&[address.to_string().as_bytes()]).to_bytes()
}

fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    if a <= b {
        keccak::hashv(&[a.as_ref(), b.as_ref()]).to_bytes()
    } else {
        keccak::hashv(&[b.as_ref(), a.as_ref()]).to_bytes()
    }
}

// All layers, leaves first, root last
fn build_layers(addresses: &[Pubkey]) -> Vec<Vec<[u8; 32]>> {
    let mut layers = vec![addresses.iter().map(leaf).collect::<Vec<_>>()];

    while layers.last().is_some_and(|layer| layer.len() > 1) {
        let next = layers
            .last()
            .map(|layer| {
                layer
                    .chunks(2)
                    .map(|pair| match pair {
                        [left, right] => hash_pair(left, right),
                        _ => pair[0],
                    })
                    .collect()
            })
            .unwrap_or_default();
        layers.push(next);
    }

    layers
}

/// Root of the allow list tree, `None` for an empty list
pub fn merkle_root(addresses: &[Pubkey]) -> Option<[u8; 32]> {
    build_layers(addresses)
        .last()
        .and_then(|layer| layer.first().copied())
}

/// Proof of membership for `address`, `None` if it is not in the list
pub fn merkle_proof(addresses: &[Pubkey], address: &Pubkey) -> Option<Vec<[u8; 32]>> {
    let mut index = addresses.iter().position(|candidate| candidate == address)?;
    let layers = build_layers(addresses);

    let mut proof = Vec::new();
    for layer in &layers[..layers.len() - 1] {
        if let Some(sibling) = layer.get(index ^ 1) {
            proof.push(*sibling);
        }
        index /= 2;
    }
    Some(proof)
}

/// Check a proof for `leaf` against `root`
pub fn verify_proof(root: &[u8; 32], leaf: &[u8; 32], proof: &[[u8; 32]]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |computed, sibling| hash_pair(&computed, sibling));
    computed == *root
}

/// Holds a wallet's proofs per group label and verifies them locally
#[derive(Debug, Clone, Default)]
pub struct MerkleProofVerifier {
    wallet: Pubkey,
    proofs: HashMap<String, Vec<[u8; 32]>>,
}

impl MerkleProofVerifier {
    pub fn new(wallet: Pubkey) -> Self {
        Self {
            wallet,
            proofs: HashMap::new(),
        }
    }

    /// Register the wallet's proof for a group
    #[must_use]
    pub fn with_proof(mut self, label: impl Into<String>, proof: Vec<[u8; 32]>) -> Self {
        self.proofs.insert(label.into(), proof);
        self
    }

    /// Build the proof for a group from its full allow list. Returns `false`
    /// when the wallet is not listed.
    pub fn add_allow_list(&mut self, label: impl Into<String>, addresses: &[Pubkey]) -> bool {
        match merkle_proof(addresses, &self.wallet) {
            Some(proof) => {
                self.proofs.insert(label.into(), proof);
                true
            }
            None => false,
        }
    }
}

impl ProofVerifier for MerkleProofVerifier {
    fn verify(&self, merkle_root: &[u8; 32], label: &str) -> bool {
        self.proofs
            .get(label)
            .is_some_and(|proof| verify_proof(merkle_root, &leaf(&self.wallet), proof))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn known_addresses() -> Vec<Pubkey> {
        [
            "11111111111111111111111111111111",
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "So11111111111111111111111111111111111111112",
            "Guard1JwRhJkVH6XZhzoYxeBVQe872VH6QggF4BWmS9g",
            "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s",
        ]
        .iter()
        .map(|address| Pubkey::from_str(address).unwrap())
        .collect()
    }

    // Tree built straight from base58 strings, the way allow list roots are published
    fn base58_string_root(addresses: &[Pubkey]) -> [u8; 32] {
        let mut layer: Vec<[u8; 32]> = addresses
            .iter()
            .map(|address| keccak::hashv(&[address.to_string().as_bytes()]).to_bytes())
            .collect();
        while layer.len() > 1 {
            layer = layer
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] if a <= b => keccak::hashv(&[a.as_ref(), b.as_ref()]).to_bytes(),
                    [a, b] => keccak::hashv(&[b.as_ref(), a.as_ref()]).to_bytes(),
                    _ => pair[0],
                })
                .collect();
        }
        layer[0]
    }

    #[test]
    fn test_root_of_known_list() {
        let expected = [
            244, 39, 248, 130, 115, 250, 44, 2, 124, 6, 36, 202, 178, 165, 46, 94, 142, 183, 25,
            216, 178, 118, 7, 167, 246, 3, 159, 74, 133, 126, 166, 87,
        ];
        assert_eq!(merkle_root(&known_addresses()), Some(expected));
    }

    #[test]
    fn test_leaf_hashes_base58_string() {
        let address = Pubkey::new_unique();
        assert_eq!(
            leaf(&address),
            keccak::hashv(&[address.to_string().as_bytes()]).to_bytes()
        );
        assert_ne!(leaf(&address), keccak::hashv(&[address.as_ref()]).to_bytes());
    }

    #[test]
    fn test_listed_wallet_verifies_against_published_root() {
        for size in [3, 4, 7] {
            let list = addresses(size);
            let root = base58_string_root(&list);
            assert_eq!(merkle_root(&list), Some(root));

            let mut verifier = MerkleProofVerifier::new(list[2]);
            assert!(verifier.add_allow_list("vip", &list));
            assert!(verifier.verify(&root, "vip"), "size {}", size);
        }
    }

    #[test]
    fn test_odd_node_moves_up_unchanged() {
        let list = addresses(3);
        let leaves: Vec<[u8; 32]> = list.iter().map(leaf).collect();
        let expected = hash_pair(&hash_pair(&leaves[0], &leaves[1]), &leaves[2]);
        assert_eq!(merkle_root(&list), Some(expected));
    }

    fn addresses(n: usize) -> Vec<Pubkey> {
        (0..n).map(|_| Pubkey::new_unique()).collect()
    }

    #[test]
    fn test_every_member_has_valid_proof() {
        for size in [1, 2, 3, 5, 8] {
            let list = addresses(size);
            let root = merkle_root(&list).unwrap();

            for address in &list {
                let proof = merkle_proof(&list, address).unwrap();
                assert!(verify_proof(&root, &leaf(address), &proof), "size {}", size);
            }
        }
    }

    #[test]
    fn test_non_member_rejected() {
        let list = addresses(4);
        let root = merkle_root(&list).unwrap();
        let outsider = Pubkey::new_unique();

        assert!(merkle_proof(&list, &outsider).is_none());
        let borrowed = merkle_proof(&list, &list[0]).unwrap();
        assert!(!verify_proof(&root, &leaf(&outsider), &borrowed));
    }

    #[test]
    fn test_empty_list_has_no_root() {
        assert!(merkle_root(&[]).is_none());
    }

    #[test]
    fn test_verifier_by_label() {
        let list = addresses(6);
        let wallet = list[3];
        let root = merkle_root(&list).unwrap();

        let mut verifier = MerkleProofVerifier::new(wallet);
        assert!(verifier.add_allow_list("vip", &list));
        assert!(verifier.verify(&root, "vip"));
        assert!(!verifier.verify(&root, "default"));
        assert!(!verifier.verify(&[0u8; 32], "vip"));

        assert!(!MerkleProofVerifier::new(Pubkey::new_unique()).add_allow_list("vip", &list));
    }

    #[test]
    fn test_closure_verifier() {
        let verifier = |_: &[u8; 32], label: &str| label == "default";
        assert!(ProofVerifier::verify(&verifier, &[0u8; 32], "default"));
        assert!(!ProofVerifier::verify(&verifier, &[0u8; 32], "other"));
    }
}
