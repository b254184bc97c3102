//! `cairn`: command-line access to a Cairn ledger.
//!
//! Opens one ledger directory, runs one command, and exits.
//!
//! # Usage
//!
//! ```text
//! cairn set Antoni Gaudí                    # append a value
//! cairn set doc body -t 1700000000 --proof  # structured value, with proofs
//! cairn get Antoni                          # latest value
//! cairn get --index 3 --proof               # value at an index, verified
//! cairn history Antoni                      # every version of a key
//! cairn scan -p fruit/ --all-versions       # prefix scan
//! cairn root --at 10                        # root at an earlier size
//! cairn inclusion 3                         # audit path for an entry
//! cairn consistency 5                       # proof from size 5 to now
//! cairn tree                                # dump stored node digests
//! cairn verify                              # full integrity check
//! ```

mod config;
mod telemetry;

use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cairn_ledger::{Entry, Item, Ledger, Payload, ScanMode, StructuredValue, Value};
use clap::{Parser, Subcommand};
use tracing::debug;

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "cairn", version, about = "Tamper-evident key-value ledger")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the ledger data directory.
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a value under a key.
    Set {
        key: String,
        value: String,

        /// Store as a structured value with this timestamp.
        #[arg(short, long)]
        timestamp: Option<u64>,

        /// Print and check inclusion and consistency proofs for the write.
        #[arg(short, long)]
        proof: bool,
    },

    /// Read the latest value of a key, or the value at an index.
    Get {
        #[arg(required_unless_present = "index")]
        key: Option<String>,

        /// Read the entry at this index instead of a key.
        #[arg(short, long, conflicts_with = "key")]
        index: Option<u64>,

        /// Print and check an inclusion proof against the current root.
        #[arg(short, long)]
        proof: bool,
    },

    /// List every version of a key, oldest first.
    History { key: String },

    /// List keys by prefix.
    Scan {
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Start strictly after this key.
        #[arg(short, long)]
        offset: Option<String>,

        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,

        /// Include every version of each key.
        #[arg(short, long)]
        all_versions: bool,
    },

    /// Print the current root, or the root at an earlier size.
    Root {
        #[arg(long)]
        at: Option<u64>,
    },

    /// Print the inclusion proof for an entry.
    Inclusion {
        index: u64,

        /// Tree size to prove against (default: current).
        #[arg(long)]
        at: Option<u64>,
    },

    /// Print the consistency proof between two sizes.
    Consistency {
        first: u64,

        /// Newer tree size (default: current).
        #[arg(long)]
        second: Option<u64>,
    },

    /// Dump the stored tree nodes, top level first.
    Tree,

    /// Re-read every entry and check it against the tree and checkpoint.
    Verify,
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(data_dir) = cli.data_dir {
        config.ledger.data_dir = data_dir;
    }

    telemetry::init(&config.log.level);

    let ledger = Ledger::open(config.ledger_config()).with_context(|| {
        format!(
            "failed to open ledger at {}",
            config.ledger.data_dir.display()
        )
    })?;

    let result = run(&ledger, cli.command);
    ledger.close().context("failed to close ledger")?;
    result
}

fn run(ledger: &Ledger, command: Commands) -> Result<()> {
    match command {
        Commands::Set {
            key,
            value,
            timestamp,
            proof,
        } => cmd_set(ledger, &key, value, timestamp, proof),
        Commands::Get { key, index, proof } => cmd_get(ledger, key.as_deref(), index, proof),
        Commands::History { key } => cmd_history(ledger, &key),
        Commands::Scan {
            prefix,
            offset,
            limit,
            all_versions,
        } => {
            let mode = if all_versions {
                ScanMode::AllVersions
            } else {
                ScanMode::Latest
            };
            cmd_scan(ledger, &prefix, offset.as_deref(), limit, mode)
        }
        Commands::Root { at } => cmd_root(ledger, at),
        Commands::Inclusion { index, at } => cmd_inclusion(ledger, index, at),
        Commands::Consistency { first, second } => cmd_consistency(ledger, first, second),
        Commands::Tree => cmd_tree(ledger),
        Commands::Verify => cmd_verify(ledger),
    }
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

fn cmd_set(
    ledger: &Ledger,
    key: &str,
    value: String,
    timestamp: Option<u64>,
    proof: bool,
) -> Result<()> {
    let value = match timestamp {
        Some(ts) => Value::from(StructuredValue::new(ts, value.into_bytes())),
        None => Value::from(value.into_bytes()),
    };

    if !proof {
        let index = ledger.set(key.as_bytes(), value)?;
        println!("index: {index}");
        return Ok(());
    }

    let prior = ledger.current_root();
    let written = ledger.set_with_proof(key.as_bytes(), value, Some(&prior))?;
    written
        .verify(Some(&prior))
        .context("write proof failed to verify")?;

    println!("index: {}", written.index);
    println!("root:  {}", written.root);
    println!("inclusion: {} hashes, verified", written.inclusion.path.len());
    match &written.consistency {
        Some(c) => println!(
            "consistency: {}..{} in {} hashes, verified",
            c.first_size,
            c.second_size,
            c.path.len()
        ),
        None => println!("consistency: none (ledger was empty)"),
    }
    Ok(())
}

fn cmd_get(ledger: &Ledger, key: Option<&str>, index: Option<u64>, proof: bool) -> Result<()> {
    if !proof {
        let item = match (key, index) {
            (_, Some(index)) => ledger.get_at_index(index)?,
            (Some(key), None) => ledger.get(key.as_bytes())?,
            (None, None) => bail!("either a key or --index is required"),
        };
        print_item(&item);
        return Ok(());
    }

    let proven = match (key, index) {
        (_, Some(index)) => ledger.get_at_index_with_proof(index)?,
        (Some(key), None) => ledger.get_with_proof(key.as_bytes())?,
        (None, None) => bail!("either a key or --index is required"),
    };
    proven.verify().context("inclusion proof failed to verify")?;

    print_item(&proven.item);
    println!("root: {}", proven.root);
    println!("inclusion: {} hashes, verified", proven.inclusion.path.len());
    Ok(())
}

fn cmd_history(ledger: &Ledger, key: &str) -> Result<()> {
    let entries = ledger.history(key.as_bytes())?;
    for entry in &entries {
        print_entry(entry);
    }
    debug!(key, versions = entries.len(), "printed history");
    Ok(())
}

fn cmd_scan(
    ledger: &Ledger,
    prefix: &str,
    offset: Option<&str>,
    limit: usize,
    mode: ScanMode,
) -> Result<()> {
    let items = ledger.scan_prefix(
        prefix.as_bytes(),
        offset.map(str::as_bytes),
        limit,
        mode,
    )?;
    for item in &items {
        print_item(item);
    }
    Ok(())
}

fn cmd_root(ledger: &Ledger, at: Option<u64>) -> Result<()> {
    let root = match at {
        Some(size) => ledger.root_at(size)?,
        None => ledger.current_root(),
    };
    println!("size: {}", root.index);
    println!("root: {}", root.digest);
    Ok(())
}

fn cmd_inclusion(ledger: &Ledger, index: u64, at: Option<u64>) -> Result<()> {
    let size = at.unwrap_or_else(|| ledger.size());
    let proof = ledger.inclusion_at(index, size)?;
    let root = ledger.root_at(size)?;
    let leaf = ledger.get_entry(index)?.leaf_digest()?;
    proof
        .verify(&leaf, &root)
        .context("inclusion proof failed to verify")?;

    println!("leaf {index} in tree of size {size}");
    println!("leaf: {leaf}");
    for (i, digest) in proof.path.iter().enumerate() {
        println!("  [{i}] {digest}");
    }
    println!("root: {}", root.digest);
    Ok(())
}

fn cmd_consistency(ledger: &Ledger, first: u64, second: Option<u64>) -> Result<()> {
    let second = second.unwrap_or_else(|| ledger.size());
    let proof = ledger.consistency_between(first, second)?;
    let old = ledger.root_at(first)?;
    let new = ledger.root_at(second)?;
    proof
        .verify(&old, &new)
        .context("consistency proof failed to verify")?;

    println!("consistency {first}..{second}");
    for (i, digest) in proof.path.iter().enumerate() {
        println!("  [{i}] {digest}");
    }
    println!("old root: {}", old.digest);
    println!("new root: {}", new.digest);
    Ok(())
}

fn cmd_tree(ledger: &Ledger) -> Result<()> {
    let levels = ledger.tree_levels();
    for (level, digests) in levels.iter().enumerate().rev() {
        println!("level {level}: {} nodes", digests.len());
        for (pos, digest) in digests.iter().enumerate() {
            println!("  [{pos}] {digest}");
        }
    }
    Ok(())
}

fn cmd_verify(ledger: &Ledger) -> Result<()> {
    let root = ledger
        .verify_integrity()
        .context("ledger failed its integrity check")?;
    println!("ok: {} entries, root {}", root.index, root.digest);
    Ok(())
}

// -----------------------------------------------------------------------
// Output
// -----------------------------------------------------------------------

fn text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::Raw(bytes)) => text(bytes).into_owned(),
        Some(Value::Structured(sv)) => {
            format!("{} (timestamp {})", text(&sv.payload), sv.timestamp)
        }
        None => "(no value)".to_string(),
    }
}

fn print_item(item: &Item) {
    match item.target_index {
        Some(target) => println!(
            "{} {} = {} (via {})",
            item.index,
            text(&item.key),
            format_value(item.value.as_ref()),
            target
        ),
        None => println!(
            "{} {} = {}",
            item.index,
            text(&item.key),
            format_value(item.value.as_ref())
        ),
    }
}

fn format_payload(payload: &Payload) -> String {
    match payload {
        Payload::Raw(bytes) => text(bytes).into_owned(),
        Payload::Structured(sv) => {
            format!("{} (timestamp {})", text(&sv.payload), sv.timestamp)
        }
        Payload::Reference {
            target_key,
            target_index,
        } => format!("-> {}@{}", text(target_key), target_index),
        Payload::Sorted { score, member } => format!("{} score {}", text(member), score),
    }
}

fn print_entry(entry: &Entry) {
    println!(
        "{} {:?} {} = {}",
        entry.index,
        entry.kind(),
        text(&entry.key),
        format_payload(&entry.payload)
    );
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
