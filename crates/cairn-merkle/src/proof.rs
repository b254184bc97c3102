//! Inclusion and consistency proofs and their verification.
//!
//! Verification follows RFC 9162 (sections 2.1.3.2 and 2.1.4.2): the verifier
//! folds the path against the leaf (or the old root) while walking the binary
//! representations of the leaf index and tree size, so no tree shape is
//! assumed and ragged right edges are handled.

use cairn_types::{Digest, Root};
use serde::{Deserialize, Serialize};

use crate::error::MerkleError;
use crate::hash::hash_node;

type Result<T> = std::result::Result<T, MerkleError>;

/// Audit path anchoring one leaf to the root of a tree of a given size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// 1-based index of the proven leaf.
    pub leaf_index: u64,
    /// Size of the tree the path leads to.
    pub tree_size: u64,
    /// Sibling digests from the leaf up to the root.
    pub path: Vec<Digest>,
}

impl InclusionProof {
    /// Recompute the root digest implied by this path and `leaf`.
    pub fn root_from_leaf(&self, leaf: &Digest) -> Result<Digest> {
        if self.leaf_index == 0 || self.leaf_index > self.tree_size {
            return Err(invalid(format!(
                "leaf {} not in tree of size {}",
                self.leaf_index, self.tree_size
            )));
        }

        let mut fn_ = self.leaf_index - 1;
        let mut sn = self.tree_size - 1;
        let mut r = *leaf;

        for p in &self.path {
            if sn == 0 {
                return Err(invalid("inclusion path too long"));
            }
            if fn_ & 1 == 1 || fn_ == sn {
                r = hash_node(p, &r);
                while fn_ & 1 == 0 && fn_ != 0 {
                    fn_ >>= 1;
                    sn >>= 1;
                }
            } else {
                r = hash_node(&r, p);
            }
            fn_ >>= 1;
            sn >>= 1;
        }

        if sn != 0 {
            return Err(invalid("inclusion path too short"));
        }
        Ok(r)
    }

    /// Check that `leaf` sits at `leaf_index` under `root`.
    pub fn verify(&self, leaf: &Digest, root: &Root) -> Result<()> {
        if root.index != self.tree_size {
            return Err(invalid(format!(
                "proof is for size {}, root is for size {}",
                self.tree_size, root.index
            )));
        }
        let computed = self.root_from_leaf(leaf)?;
        if computed != root.digest {
            return Err(invalid(format!(
                "recomputed root {computed} does not match {}",
                root.digest
            )));
        }
        Ok(())
    }
}

/// Proof that a tree of size `second_size` extends the tree of size
/// `first_size` without altering, reordering, or removing any leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyProof {
    /// Size of the older tree.
    pub first_size: u64,
    /// Size of the newer tree.
    pub second_size: u64,
    /// Node digests shared by both trees plus those appended since.
    pub path: Vec<Digest>,
}

impl ConsistencyProof {
    /// Derive `(old_root, new_root)` from the path.
    ///
    /// `first_hash` is only folded in when `first_size` is a power of two;
    /// in that case the old root is itself a node of the new tree and is not
    /// repeated in the path. Otherwise both roots come from the path alone.
    pub fn derive_roots(&self, first_hash: &Digest) -> Result<(Digest, Digest)> {
        let (first, second) = (self.first_size, self.second_size);
        if first == 0 || first > second {
            return Err(invalid(format!("bad consistency range {first}..{second}")));
        }

        if first == second {
            if !self.path.is_empty() {
                return Err(invalid("non-empty path for equal sizes"));
            }
            return Ok((*first_hash, *first_hash));
        }

        let mut path = self.path.iter();
        let seed = if first.is_power_of_two() {
            *first_hash
        } else {
            *path
                .next()
                .ok_or_else(|| invalid("empty consistency path"))?
        };

        let mut fn_ = first - 1;
        let mut sn = second - 1;
        while fn_ & 1 == 1 {
            fn_ >>= 1;
            sn >>= 1;
        }

        let mut fr = seed;
        let mut sr = seed;
        for c in path {
            if sn == 0 {
                return Err(invalid("consistency path too long"));
            }
            if fn_ & 1 == 1 || fn_ == sn {
                fr = hash_node(c, &fr);
                sr = hash_node(c, &sr);
                while fn_ & 1 == 0 && fn_ != 0 {
                    fn_ >>= 1;
                    sn >>= 1;
                }
            } else {
                sr = hash_node(&sr, c);
            }
            fn_ >>= 1;
            sn >>= 1;
        }

        if sn != 0 {
            return Err(invalid("consistency path too short"));
        }
        Ok((fr, sr))
    }

    /// Check that `new` is an append-only extension of `old`.
    pub fn verify(&self, old: &Root, new: &Root) -> Result<()> {
        if old.index != self.first_size || new.index != self.second_size {
            return Err(invalid(format!(
                "proof is for {}..{}, roots are for {}..{}",
                self.first_size, self.second_size, old.index, new.index
            )));
        }

        let (fr, sr) = self.derive_roots(&old.digest)?;
        if fr != old.digest {
            return Err(invalid(format!("old root {} not reproduced", old.digest)));
        }
        if sr != new.digest {
            return Err(invalid(format!("new root {} not reproduced", new.digest)));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> MerkleError {
    MerkleError::InvalidProof(msg.into())
}
