//! Durable storage for the entry log (Fjall disk or pure in-memory).
//!
//! Two keyspaces: `entries` maps the big-endian index to the postcard-encoded
//! [`Entry`], and `meta` holds the commit checkpoint. An entry only counts
//! once a checkpoint covering its index has been written.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use cairn_types::Root;
use fjall::{Database, Keyspace, KeyspaceCreateOptions, PersistMode};

use crate::entry::Entry;
use crate::error::LedgerError;

type Result<T> = std::result::Result<T, LedgerError>;

const CHECKPOINT_KEY: &[u8] = b"checkpoint";

/// Inner backend: either Fjall-backed (disk) or pure in-memory.
enum Backend {
    Fjall {
        db: Database,
        entries: Keyspace,
        meta: Keyspace,
    },
    Memory(Box<MemoryBackend>),
}

/// Pure in-memory storage.
#[derive(Default)]
struct MemoryBackend {
    /// index → serialized Entry.
    entries: RwLock<BTreeMap<u64, Vec<u8>>>,
    /// Serialized commit checkpoint.
    checkpoint: RwLock<Option<Vec<u8>>>,
}

/// Storage backend for the ledger.
pub struct LedgerStore {
    backend: Backend,
}

fn storage_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn index_key(index: u64) -> [u8; 8] {
    index.to_be_bytes()
}

fn decode_index_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| {
        LedgerError::corruption(0, format!("malformed entry key of {} bytes", key.len()))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

impl LedgerStore {
    /// Open a persistent store at the given path (Fjall backend).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::builder(path).open().map_err(storage_err)?;
        let entries = db
            .keyspace("ledger_entries", KeyspaceCreateOptions::default)
            .map_err(storage_err)?;
        let meta = db
            .keyspace("ledger_meta", KeyspaceCreateOptions::default)
            .map_err(storage_err)?;
        Ok(Self {
            backend: Backend::Fjall { db, entries, meta },
        })
    }

    /// Create a pure in-memory store.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Box::default()),
        }
    }

    // ----- Entries -----

    /// Store an entry under its index.
    pub fn put_entry(&self, entry: &Entry) -> Result<()> {
        let bytes = postcard::to_allocvec(entry)?;
        self.put_raw_entry(entry.index, bytes)
    }

    /// Store an already-encoded record under `index`.
    ///
    /// Nothing checks that the bytes decode; recovery and
    /// `Ledger::verify_integrity` will.
    pub fn put_raw_entry(&self, index: u64, bytes: Vec<u8>) -> Result<()> {
        match &self.backend {
            Backend::Fjall { entries, .. } => {
                entries.insert(index_key(index), bytes).map_err(storage_err)?;
            }
            Backend::Memory(m) => {
                m.entries
                    .write()
                    .expect("lock poisoned")
                    .insert(index, bytes);
            }
        }
        Ok(())
    }

    /// Retrieve the encoded record at `index`.
    pub fn get_raw_entry(&self, index: u64) -> Result<Option<Vec<u8>>> {
        match &self.backend {
            Backend::Fjall { entries, .. } => Ok(entries
                .get(index_key(index))
                .map_err(storage_err)?
                .map(|v| v.to_vec())),
            Backend::Memory(m) => Ok(m
                .entries
                .read()
                .expect("lock poisoned")
                .get(&index)
                .cloned()),
        }
    }

    /// Visit every stored record in index order.
    pub fn for_each_raw_entry(
        &self,
        mut visit: impl FnMut(u64, &[u8]) -> Result<()>,
    ) -> Result<()> {
        match &self.backend {
            Backend::Fjall { entries, .. } => {
                for guard in entries.iter() {
                    let (key_bytes, val_bytes) = guard.into_inner().map_err(storage_err)?;
                    visit(decode_index_key(&key_bytes)?, &val_bytes)?;
                }
            }
            Backend::Memory(m) => {
                let entries = m.entries.read().expect("lock poisoned");
                for (index, bytes) in entries.iter() {
                    visit(*index, bytes)?;
                }
            }
        }
        Ok(())
    }

    /// Remove the record at `index`.
    pub fn remove_entry(&self, index: u64) -> Result<()> {
        match &self.backend {
            Backend::Fjall { entries, .. } => {
                entries.remove(index_key(index)).map_err(storage_err)?;
            }
            Backend::Memory(m) => {
                m.entries.write().expect("lock poisoned").remove(&index);
            }
        }
        Ok(())
    }

    // ----- Checkpoint -----

    /// Record `root` as the committed size and digest.
    pub fn put_checkpoint(&self, root: &Root) -> Result<()> {
        let bytes = postcard::to_allocvec(root)?;

        match &self.backend {
            Backend::Fjall { meta, .. } => {
                meta.insert(CHECKPOINT_KEY, bytes).map_err(storage_err)?;
            }
            Backend::Memory(m) => {
                *m.checkpoint.write().expect("lock poisoned") = Some(bytes);
            }
        }
        Ok(())
    }

    /// The last committed root, if anything was ever committed.
    pub fn get_checkpoint(&self) -> Result<Option<Root>> {
        let bytes = match &self.backend {
            Backend::Fjall { meta, .. } => meta
                .get(CHECKPOINT_KEY)
                .map_err(storage_err)?
                .map(|v| v.to_vec()),
            Backend::Memory(m) => m.checkpoint.read().expect("lock poisoned").clone(),
        };

        match bytes {
            Some(b) => postcard::from_bytes(&b)
                .map(Some)
                .map_err(|e| LedgerError::corruption(0, format!("undecodable checkpoint: {e}"))),
            None => Ok(None),
        }
    }

    /// Flush everything written so far to stable storage.
    pub fn persist(&self) -> Result<()> {
        match &self.backend {
            Backend::Fjall { db, .. } => db.persist(PersistMode::SyncAll).map_err(storage_err),
            Backend::Memory(_) => Ok(()),
        }
    }

    /// Whether this store lives only in memory.
    pub fn is_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }
}
