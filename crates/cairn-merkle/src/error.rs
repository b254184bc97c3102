//! Error types for the Merkle tree crate.

/// Errors returned by proof generation and verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    /// A leaf index is zero or beyond the requested tree size.
    #[error("leaf index {leaf_index} out of range for tree size {tree_size}")]
    LeafOutOfRange {
        /// The requested 1-based leaf index.
        leaf_index: u64,
        /// The tree size the proof was requested against.
        tree_size: u64,
    },

    /// A requested tree size exceeds the current size of the tree.
    #[error("tree size {requested} exceeds current size {current}")]
    SizeOutOfRange {
        /// The requested tree size.
        requested: u64,
        /// The current tree size.
        current: u64,
    },

    /// A consistency range with `first == 0` or `first > second`.
    #[error("invalid consistency range: {first}..{second}")]
    InvalidRange {
        /// Size of the older tree.
        first: u64,
        /// Size of the newer tree.
        second: u64,
    },

    /// Verifier-side mismatch. Never returned by proof generation.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

impl MerkleError {
    /// Whether this error reports indices or sizes beyond the tree.
    pub fn is_out_of_range(&self) -> bool {
        !matches!(self, MerkleError::InvalidProof(_))
    }
}
