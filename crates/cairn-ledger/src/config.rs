//! Ledger configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Fjall LSM keyspaces on disk.
    #[default]
    Fjall,
    /// Process memory. Lost on drop.
    Memory,
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding the Fjall database.
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    /// Maximum number of entries in one batch write.
    pub max_batch_size: usize,
    /// Maximum key length in bytes.
    pub max_key_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: StorageBackend::Fjall,
            max_batch_size: 1024,
            max_key_size: 1024,
        }
    }
}

impl LedgerConfig {
    /// On-disk ledger at `data_dir`, other settings default.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// In-memory ledger, other settings default.
    pub fn in_memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Self::default()
        }
    }
}
