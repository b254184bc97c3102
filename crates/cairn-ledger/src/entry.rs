//! Log entry types and the items returned by reads.

use cairn_merkle::{InclusionProof, hash_leaf};
use cairn_types::{Digest, Root, Score, StructuredValue, Value};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

type Result<T> = std::result::Result<T, LedgerError>;

/// One immutable record of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// 1-based position in the log.
    pub index: u64,
    /// The key written. For sorted-set entries, the set name.
    pub key: Vec<u8>,
    /// What was written.
    pub payload: Payload,
}

/// The content of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Plain bytes.
    Raw(Vec<u8>),
    /// Timestamped bytes.
    Structured(StructuredValue),
    /// Alias of another key, pinned to that key's latest index at write time.
    Reference { target_key: Vec<u8>, target_index: u64 },
    /// Sorted-set membership of `member` with `score`.
    Sorted { score: Score, member: Vec<u8> },
}

/// Discriminant of [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Raw,
    Reference,
    Sorted,
    Structured,
}

impl Payload {
    pub fn kind(&self) -> EntryKind {
        match self {
            Payload::Raw(_) => EntryKind::Raw,
            Payload::Structured(_) => EntryKind::Structured,
            Payload::Reference { .. } => EntryKind::Reference,
            Payload::Sorted { .. } => EntryKind::Sorted,
        }
    }

    /// The value carried directly by this payload, if any.
    pub fn value(&self) -> Option<Value> {
        match self {
            Payload::Raw(bytes) => Some(Value::Raw(bytes.clone())),
            Payload::Structured(sv) => Some(Value::Structured(sv.clone())),
            Payload::Reference { .. } | Payload::Sorted { .. } => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Raw(bytes) => Payload::Raw(bytes),
            Value::Structured(sv) => Payload::Structured(sv),
        }
    }
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        self.payload.kind()
    }

    /// Leaf digest of this entry in the Merkle tree:
    /// `hash_leaf(u32be(len(key)) || key || postcard(payload))`.
    ///
    /// The index is not hashed; it is the leaf's position.
    pub fn leaf_digest(&self) -> Result<Digest> {
        let key_len = u32::try_from(self.key.len())
            .map_err(|_| LedgerError::InvalidKey(format!("{} bytes", self.key.len())))?;
        let payload = postcard::to_allocvec(&self.payload)?;

        let mut data = Vec::with_capacity(4 + self.key.len() + payload.len());
        data.extend_from_slice(&key_len.to_be_bytes());
        data.extend_from_slice(&self.key);
        data.extend_from_slice(&payload);
        Ok(hash_leaf(&data))
    }
}

/// A resolved read.
///
/// For references and sorted-set entries, `index` is the entry that was read
/// (the one to prove), while `key`, `value` and `target_index` describe the
/// entry it resolved to. A sorted-set member with no value of its own has
/// `value` and `target_index` set to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub index: u64,
    pub key: Vec<u8>,
    pub value: Option<Value>,
    pub target_index: Option<u64>,
}

impl Item {
    /// Payload bytes of the resolved value, if there is one.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.value.as_ref().map(Value::bytes)
    }
}

/// A resolved sorted-set member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedMember {
    pub set: Vec<u8>,
    pub score: Score,
    pub member: Vec<u8>,
    /// Index of the sorted-set entry that placed the member.
    pub index: u64,
    /// Current value of the member key, if it has one.
    pub item: Option<Item>,
}

/// A read together with the proof that its entry is in the log.
#[derive(Debug, Clone)]
pub struct ProvenItem {
    pub item: Item,
    /// The stored entry at `item.index`, needed to recompute its leaf.
    pub entry: Entry,
    pub root: Root,
    pub inclusion: InclusionProof,
}

impl ProvenItem {
    /// Check the inclusion proof against the carried root.
    pub fn verify(&self) -> Result<()> {
        let leaf = self.entry.leaf_digest()?;
        self.inclusion.verify(&leaf, &self.root)?;
        Ok(())
    }
}

/// Outcome of a write that also returns proofs.
#[derive(Debug, Clone)]
pub struct WriteProof {
    pub index: u64,
    /// The entry as stored.
    pub entry: Entry,
    /// Root right after the write.
    pub root: Root,
    pub inclusion: InclusionProof,
    /// Present when the caller supplied a non-empty prior root.
    pub consistency: Option<cairn_merkle::ConsistencyProof>,
}

impl WriteProof {
    /// Check inclusion of the written entry, and consistency with `prior`
    /// when one was pinned.
    pub fn verify(&self, prior: Option<&Root>) -> Result<()> {
        let leaf = self.entry.leaf_digest()?;
        self.inclusion.verify(&leaf, &self.root)?;

        if let Some(prior) = prior
            && prior.index > 0
        {
            let proof = self
                .consistency
                .as_ref()
                .ok_or(LedgerError::RootMismatch(*prior))?;
            proof.verify(prior, &self.root)?;
        }
        Ok(())
    }
}
