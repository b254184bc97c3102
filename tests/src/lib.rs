//! Shared test harness for Cairn integration tests.
//!
//! Provides [`TestLedger`], an on-disk ledger in a temporary directory that
//! can be restarted, and helpers that simulate a writer dying between
//! storing entries and storing the checkpoint.

use std::path::Path;

use cairn_ledger::{Entry, Ledger, LedgerConfig, LedgerError, LedgerStore, Payload, Value};
use tempfile::TempDir;

// =========================================================================
// TestLedger
// =========================================================================

/// An on-disk ledger that survives restarts within one test.
pub struct TestLedger {
    dir: TempDir,
    ledger: Option<Ledger>,
}

impl TestLedger {
    /// Open a fresh ledger in a new temporary directory.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Open a fresh ledger, letting the caller adjust the config first.
    pub fn with_config(adjust: impl FnOnce(&mut LedgerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LedgerConfig::at(dir.path());
        adjust(&mut config);
        let ledger = Ledger::open(config).unwrap();
        Self {
            dir,
            ledger: Some(ledger),
        }
    }

    /// The open ledger.
    pub fn ledger(&self) -> &Ledger {
        self.ledger.as_ref().expect("ledger is closed")
    }

    /// Directory holding the ledger's database.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Close the ledger cleanly and open it again from disk.
    pub fn restart(&mut self) {
        let config = self.ledger().config().clone();
        self.shutdown();
        self.ledger = Some(Ledger::open(config).unwrap());
    }

    /// Close the ledger, leaving the directory in place.
    pub fn shutdown(&mut self) {
        if let Some(ledger) = self.ledger.take() {
            ledger.close().unwrap();
        }
    }

    /// Reopen after [`shutdown`](Self::shutdown), returning the open error
    /// instead of panicking.
    pub fn try_reopen(&mut self) -> Result<(), LedgerError> {
        self.ledger = Some(Ledger::open(LedgerConfig::at(self.dir.path()))?);
        Ok(())
    }

    /// Run `f` against the raw store while the ledger is closed.
    ///
    /// The ledger must already be shut down.
    pub fn with_store<T>(&self, f: impl FnOnce(&LedgerStore) -> T) -> T {
        assert!(self.ledger.is_none(), "shut the ledger down first");
        let store = LedgerStore::open(self.dir.path()).unwrap();
        let out = f(&store);
        store.persist().unwrap();
        out
    }

    /// Simulate a writer that stored `entries` past the checkpoint and died
    /// before storing the new checkpoint. Leaves the ledger closed.
    pub fn crash_after_entries(&mut self, keys: &[&str]) {
        let size = self.ledger().size();
        self.shutdown();
        self.with_store(|store| {
            for (offset, key) in keys.iter().enumerate() {
                let entry = Entry {
                    index: size + 1 + offset as u64,
                    key: key.as_bytes().to_vec(),
                    payload: Payload::from(Value::from(format!("lost-{key}").as_str())),
                };
                store.put_entry(&entry).unwrap();
            }
        });
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestLedger {
    fn drop(&mut self) {
        if let Some(ledger) = self.ledger.take() {
            let _ = ledger.close();
        }
    }
}

// =========================================================================
// Data helpers
// =========================================================================

/// Generate deterministic test data of a given size.
pub fn test_data(size: usize) -> Vec<u8> {
    test_data_seeded(size, 0)
}

/// Generate deterministic test data with a specific seed.
pub fn test_data_seeded(size: usize, seed: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = seed;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

/// Fill `ledger` with `n` keys `key-{i:04}`, each holding seeded data of
/// `size` bytes. Returns the written `(key, value)` pairs in order.
pub fn fill(ledger: &Ledger, n: u32, size: usize) -> Vec<(String, Vec<u8>)> {
    (0..n)
        .map(|i| {
            let key = format!("key-{i:04}");
            let value = test_data_seeded(size, i + 1);
            ledger.set(key.as_bytes(), value.clone()).unwrap();
            (key, value)
        })
        .collect()
}
