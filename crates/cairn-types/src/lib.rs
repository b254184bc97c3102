//! Shared types for Cairn.
//!
//! This crate defines the small value types used across the workspace:
//! the [`Digest`] produced by the Merkle tree, the [`Root`] checkpoint,
//! the [`Value`] returned by reads (raw bytes or a [`StructuredValue`]),
//! the sorted-set [`Score`], and the [`ScanMode`] for prefix scans.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// A 32-byte BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Hash arbitrary data with BLAKE3.
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.into())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// A checkpoint of the ledger: the tree size and the digest over all entries
/// up to that size.
///
/// Callers may pin a `Root` and later ask for a consistency proof against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Root {
    /// Tree size (the index of the last entry covered).
    pub index: u64,
    /// Root digest at that size.
    pub digest: Digest,
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.digest, self.index)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A typed payload wrapping a value with a caller-supplied timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuredValue {
    /// Caller-supplied timestamp (typically Unix seconds).
    pub timestamp: u64,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl StructuredValue {
    pub fn new(timestamp: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }
}

/// The value stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Plain bytes.
    Raw(Vec<u8>),
    /// Timestamped payload.
    Structured(StructuredValue),
}

impl Value {
    /// The payload bytes, regardless of encoding.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Value::Raw(bytes) => bytes,
            Value::Structured(sv) => &sv.payload,
        }
    }

    /// Return the structured form, if this is a structured value.
    pub fn as_structured(&self) -> Option<&StructuredValue> {
        match self {
            Value::Structured(sv) => Some(sv),
            Value::Raw(_) => None,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Raw(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Raw(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(bytes: &[u8; N]) -> Self {
        Value::Raw(bytes.to_vec())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Raw(s.as_bytes().to_vec())
    }
}

impl From<StructuredValue> for Value {
    fn from(sv: StructuredValue) -> Self {
        Value::Structured(sv)
    }
}

// ---------------------------------------------------------------------------
// Sorted sets
// ---------------------------------------------------------------------------

/// A sorted-set score with a total order.
///
/// NaN is not representable; `-0.0` is normalized to `0.0` so that equal
/// scores compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Score(f64);

impl Score {
    /// Create a score, rejecting NaN.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        // -0.0 == 0.0, so this maps both zeros to +0.0.
        Some(Self(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

/// How a prefix scan treats keys with several versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    /// One item per key: its latest version.
    #[default]
    Latest,
    /// Every version of every key, oldest to newest within a key.
    AllVersions,
}
