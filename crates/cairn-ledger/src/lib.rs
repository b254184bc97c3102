//! Tamper-evident key-value ledger.
//!
//! Every write is appended to an entry log and hashed into a Merkle history
//! tree (see `cairn-merkle`). Readers can obtain inclusion proofs for any
//! entry and consistency proofs between any two roots, so a value's presence
//! at a point in history and the append-only growth of the log can both be
//! checked without trusting the ledger.
//!
//! Besides plain values the log carries references (aliases resolved at read
//! time) and sorted-set memberships, all covered by the same tree.

mod config;
mod entry;
mod error;
mod index;
mod ledger;
mod store;


pub use config::{LedgerConfig, StorageBackend};
pub use entry::{Entry, EntryKind, Item, Payload, ProvenItem, SortedMember, WriteProof};
pub use error::{ErrorKind, LedgerError};
pub use ledger::Ledger;
pub use store::LedgerStore;

pub use cairn_merkle::{ConsistencyProof, InclusionProof};
pub use cairn_types::{Digest, Root, ScanMode, Score, StructuredValue, Value};
