//! TOML configuration for the `cairn` CLI.

use std::path::{Path, PathBuf};

use cairn_ledger::{LedgerConfig, StorageBackend};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Ledger location and limits.
    pub ledger: LedgerSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[ledger]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Directory holding the ledger database.
    pub data_dir: PathBuf,
    /// Backend type: `"fjall"` (default) or `"memory"`.
    pub backend: StorageBackend,
    /// Maximum entries per batch write.
    pub max_batch_size: Option<usize>,
    /// Maximum key length in bytes.
    pub max_key_size: Option<usize>,
}

impl Default for LedgerSection {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".cairn"))
            .unwrap_or_else(|| PathBuf::from(".cairn"));
        Self {
            data_dir,
            backend: StorageBackend::Fjall,
            max_batch_size: None,
            max_key_size: None,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Ledger settings with defaults filled in.
    pub fn ledger_config(&self) -> LedgerConfig {
        let defaults = LedgerConfig::default();
        LedgerConfig {
            data_dir: self.ledger.data_dir.clone(),
            backend: self.ledger.backend,
            max_batch_size: self
                .ledger
                .max_batch_size
                .unwrap_or(defaults.max_batch_size),
            max_key_size: self.ledger.max_key_size.unwrap_or(defaults.max_key_size),
        }
    }
}
