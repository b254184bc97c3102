//! Error types for the ledger crate.

use cairn_merkle::MerkleError;
use cairn_types::Root;

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    OutOfRange,
    InvalidProof,
    Corruption,
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A write batch with no entries.
    #[error("batch is empty")]
    EmptyBatch,

    /// A write batch larger than the configured maximum.
    #[error("batch of {len} entries exceeds the maximum of {max}")]
    BatchTooLarge { len: usize, max: usize },

    /// Empty or oversized key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// NaN score for a sorted-set operation.
    #[error("invalid score: {0}")]
    InvalidScore(f64),

    /// Page number or page size of zero.
    #[error("invalid page: number {page}, size {size}")]
    InvalidPage { page: u64, size: u64 },

    /// A structured read hit a raw value.
    #[error("value at index {0} is not structured")]
    NotStructured(u64),

    /// A caller-pinned root that this ledger never produced.
    #[error("root {0} is not a root of this ledger")]
    RootMismatch(Root),

    /// Key was never written.
    #[error("key not found: {}", String::from_utf8_lossy(.0))]
    KeyNotFound(Vec<u8>),

    /// Index is zero or past the end of the log.
    #[error("index not found: {0}")]
    IndexNotFound(u64),

    /// Proof generation or verification failure.
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// Stored state disagrees with itself. `index` is 0 when the damage
    /// cannot be attributed to a single entry.
    #[error("corruption at index {index}: {reason}")]
    Corruption { index: u64, reason: String },

    /// Writes refused after a failed integrity check.
    #[error("ledger is poisoned by a failed integrity check")]
    Poisoned,

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyBatch
            | Self::BatchTooLarge { .. }
            | Self::InvalidKey(_)
            | Self::InvalidScore(_)
            | Self::InvalidPage { .. }
            | Self::NotStructured(_)
            | Self::RootMismatch(_) => ErrorKind::InvalidInput,
            Self::KeyNotFound(_) | Self::IndexNotFound(_) => ErrorKind::NotFound,
            Self::Merkle(e) if e.is_out_of_range() => ErrorKind::OutOfRange,
            Self::Merkle(_) => ErrorKind::InvalidProof,
            Self::Corruption { .. } | Self::Poisoned => ErrorKind::Corruption,
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn corruption(index: u64, reason: impl Into<String>) -> Self {
        Self::Corruption {
            index,
            reason: reason.into(),
        }
    }
}

impl From<postcard::Error> for LedgerError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
