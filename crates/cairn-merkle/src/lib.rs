//! Merkle history tree with inclusion and consistency proofs.
//!
//! [`HistoryTree`] is an incremental, append-only binary hash tree in the
//! style of certificate-transparency logs (RFC 6962). It answers two proof
//! queries:
//!
//! - [`InclusionProof`]: a leaf is part of the tree at a given size.
//! - [`ConsistencyProof`]: the tree at a later size is an append-only
//!   extension of the tree at an earlier size.
//!
//! Leaves and interior nodes are hashed with BLAKE3 under distinct prefix
//! bytes (see [`hash_leaf`] and [`hash_node`]).

mod error;
mod hash;
mod proof;
mod tree;

pub use error::MerkleError;
pub use hash::{LEAF_PREFIX, NODE_PREFIX, empty_root, hash_leaf, hash_node};
pub use proof::{ConsistencyProof, InclusionProof};
pub use tree::{Frontier, HistoryTree};
