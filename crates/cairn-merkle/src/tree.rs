//! Incremental Merkle history tree.
//!
//! The tree is the left-complete binary tree used by certificate-transparency
//! logs: at size `n` it is uniquely determined, and its root is
//! `MTH(D[0:n])`. Only the digests of complete, aligned subtrees are stored,
//! one vector per level. `levels[l][p]` covers leaves `[p * 2^l, (p + 1) * 2^l)`.
//! Appending pushes new digests and never rewrites an existing one, so every
//! root and proof computed at size `k` stays valid as the tree grows.

use cairn_types::{Digest, Root};

use crate::error::MerkleError;
use crate::hash::{empty_root, hash_node};
use crate::proof::{ConsistencyProof, InclusionProof};

type Result<T> = std::result::Result<T, MerkleError>;

/// Append-only Merkle history tree over leaf digests.
#[derive(Debug, Clone, Default)]
pub struct HistoryTree {
    levels: Vec<Vec<Digest>>,
}

impl HistoryTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leaves in the tree.
    pub fn size(&self) -> u64 {
        self.levels.first().map_or(0, |leaves| leaves.len() as u64)
    }

    /// Append one leaf digest. Returns the new tree size.
    pub fn append(&mut self, leaf: Digest) -> u64 {
        if self.levels.is_empty() {
            self.levels.push(Vec::new());
        }
        self.levels[0].push(leaf);

        // Close every subtree this leaf completes, bottom-up.
        let mut level = 0;
        let mut pos = self.levels[0].len() - 1;
        while pos % 2 == 1 {
            let parent = hash_node(&self.levels[level][pos - 1], &self.levels[level][pos]);
            level += 1;
            if self.levels.len() == level {
                self.levels.push(Vec::new());
            }
            self.levels[level].push(parent);
            pos /= 2;
        }

        self.size()
    }

    /// Append a sequence of leaf digests. Returns the new tree size.
    pub fn extend(&mut self, leaves: impl IntoIterator<Item = Digest>) -> u64 {
        for leaf in leaves {
            self.append(leaf);
        }
        self.size()
    }

    /// Digest of the leaf at a 1-based index.
    pub fn leaf(&self, index: u64) -> Option<Digest> {
        let pos = index.checked_sub(1)?;
        self.levels.first()?.get(pos as usize).copied()
    }

    /// Stored digests of complete subtrees, level 0 (leaves) first.
    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    /// The right edge of the tree: one complete subtree per set bit of the
    /// size, largest first.
    pub fn frontier(&self) -> Frontier {
        let size = self.size();
        let mut peaks = Vec::new();
        let mut start = 0u64;
        for level in (0..u64::BITS).rev() {
            let width = 1u64 << level;
            if size & width != 0 {
                let digest = self.levels[level as usize][(start >> level) as usize];
                peaks.push((level, digest));
                start += width;
            }
        }
        Frontier { size, peaks }
    }

    /// Current root.
    pub fn root(&self) -> Root {
        let size = self.size();
        Root {
            index: size,
            digest: self.digest_at(size),
        }
    }

    /// Root of the tree as it was at `size`.
    pub fn root_at(&self, size: u64) -> Result<Root> {
        self.check_size(size)?;
        Ok(Root {
            index: size,
            digest: self.digest_at(size),
        })
    }

    /// Audit path proving that leaf `leaf_index` (1-based) is included in the
    /// tree of size `at_size`.
    pub fn inclusion_proof(&self, leaf_index: u64, at_size: u64) -> Result<InclusionProof> {
        self.check_size(at_size)?;
        if leaf_index == 0 || leaf_index > at_size {
            return Err(MerkleError::LeafOutOfRange {
                leaf_index,
                tree_size: at_size,
            });
        }

        let mut path = Vec::new();
        self.audit_path(leaf_index - 1, 0, at_size, &mut path);

        Ok(InclusionProof {
            leaf_index,
            tree_size: at_size,
            path,
        })
    }

    /// Proof that the tree of size `second` is an append-only extension of
    /// the tree of size `first`.
    pub fn consistency_proof(&self, first: u64, second: u64) -> Result<ConsistencyProof> {
        if first == 0 || first > second {
            return Err(MerkleError::InvalidRange { first, second });
        }
        self.check_size(second)?;

        let mut path = Vec::new();
        if first < second {
            self.subproof(first, 0, second, true, &mut path);
        }

        Ok(ConsistencyProof {
            first_size: first,
            second_size: second,
            path,
        })
    }

    fn check_size(&self, requested: u64) -> Result<()> {
        let current = self.size();
        if requested > current {
            return Err(MerkleError::SizeOutOfRange { requested, current });
        }
        Ok(())
    }

    fn digest_at(&self, size: u64) -> Digest {
        if size == 0 {
            empty_root()
        } else {
            self.subtree(0, size)
        }
    }

    /// `MTH(D[start:end])`. Requires `start < end <= size`.
    fn subtree(&self, start: u64, end: u64) -> Digest {
        let n = end - start;
        if n.is_power_of_two() && start % n == 0 {
            let level = n.trailing_zeros() as usize;
            return self.levels[level][(start >> level) as usize];
        }

        let k = split_point(n);
        hash_node(&self.subtree(start, start + k), &self.subtree(start + k, end))
    }

    /// RFC 6962 `PATH(m, D[start:end])`, `m` relative to `start`.
    fn audit_path(&self, m: u64, start: u64, end: u64, out: &mut Vec<Digest>) {
        let n = end - start;
        if n <= 1 {
            return;
        }

        let k = split_point(n);
        if m < k {
            self.audit_path(m, start, start + k, out);
            out.push(self.subtree(start + k, end));
        } else {
            self.audit_path(m - k, start + k, end, out);
            out.push(self.subtree(start, start + k));
        }
    }

    /// RFC 6962 `SUBPROOF(m, D[start:end], b)`.
    fn subproof(&self, m: u64, start: u64, end: u64, complete: bool, out: &mut Vec<Digest>) {
        let n = end - start;
        if m == n {
            if !complete {
                out.push(self.subtree(start, end));
            }
            return;
        }

        let k = split_point(n);
        if m <= k {
            self.subproof(m, start, start + k, complete, out);
            out.push(self.subtree(start + k, end));
        } else {
            self.subproof(m - k, start + k, end, false, out);
            out.push(self.subtree(start, start + k));
        }
    }
}

/// Detached copy of a tree's right edge.
///
/// Pushing leaves onto a `Frontier` yields the root the tree would have after
/// the same appends, without touching the tree itself.
#[derive(Debug, Clone)]
pub struct Frontier {
    size: u64,
    peaks: Vec<(u32, Digest)>,
}

impl Frontier {
    /// Number of leaves covered.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Add one leaf, merging equal-height peaks.
    pub fn push(&mut self, leaf: Digest) {
        let mut level = 0;
        let mut digest = leaf;
        while let Some(&(top_level, top)) = self.peaks.last() {
            if top_level != level {
                break;
            }
            self.peaks.pop();
            digest = hash_node(&top, &digest);
            level += 1;
        }
        self.peaks.push((level, digest));
        self.size += 1;
    }

    /// Root over everything covered so far.
    pub fn root(&self) -> Root {
        let digest = self
            .peaks
            .iter()
            .rev()
            .map(|(_, digest)| *digest)
            .reduce(|right, left| hash_node(&left, &right))
            .unwrap_or_else(empty_root);
        Root {
            index: self.size,
            digest,
        }
    }
}

/// Largest power of two strictly less than `n`. Requires `n >= 2`.
fn split_point(n: u64) -> u64 {
    1 << (63 - (n - 1).leading_zeros())
}
