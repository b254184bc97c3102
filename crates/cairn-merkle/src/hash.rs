//! Domain-separated BLAKE3 hashing for leaves and interior nodes.

use cairn_types::Digest;

/// Prefix byte for leaf digests.
pub const LEAF_PREFIX: u8 = 0x00;

/// Prefix byte for interior node digests.
pub const NODE_PREFIX: u8 = 0x01;

/// Digest of a leaf: `H(0x00 || data)`.
pub fn hash_leaf(data: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest of an interior node: `H(0x01 || left || right)`.
pub fn hash_node(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hasher.finalize().into()
}

/// Root digest of the empty tree: `H()`.
pub fn empty_root() -> Digest {
    Digest::of(&[])
}
