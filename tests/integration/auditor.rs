//! Integration test: external auditor.
//!
//! An auditor that trusts nothing but the roots it has pinned. It replays
//! the log into its own tree, checks every proof the ledger hands out, and
//! notices when history has been rewritten.

use cairn_integration_tests::{TestLedger, fill};
use cairn_ledger::{Entry, ErrorKind, Ledger, LedgerError, LedgerStore, Root};
use cairn_merkle::HistoryTree;
use proptest::prelude::*;

/// Roots the auditor has seen, oldest first.
struct Auditor {
    pinned: Vec<Root>,
}

impl Auditor {
    fn new() -> Self {
        Self { pinned: Vec::new() }
    }

    /// Pin the ledger's current root after checking it extends every root
    /// pinned so far.
    fn observe(&mut self, ledger: &Ledger) {
        let current = ledger.current_root();
        for old in &self.pinned {
            if old.index == 0 {
                continue;
            }
            let proof = ledger.consistency_between(old.index, current.index).unwrap();
            proof
                .verify(old, &current)
                .unwrap_or_else(|e| panic!("{old} -> {current}: {e}"));
        }
        self.pinned.push(current);
    }

    /// Rebuild the tree from raw entries and compare with the ledger's root.
    fn replay(&self, ledger: &Ledger) -> Root {
        let mut tree = HistoryTree::new();
        for index in 1..=ledger.size() {
            let entry = ledger.get_entry(index).unwrap();
            assert_eq!(entry.index, index);
            tree.append(entry.leaf_digest().unwrap());
        }
        tree.root()
    }
}

#[test]
fn test_independent_replay_matches_root() {
    let t = TestLedger::new();
    fill(t.ledger(), 77, 48);
    t.ledger().reference(b"alias", b"key-0003").unwrap();
    t.ledger().sorted_add(b"set", -1.5, b"key-0004").unwrap();

    let auditor = Auditor::new();
    assert_eq!(auditor.replay(t.ledger()), t.ledger().current_root());
}

#[test]
fn test_auditor_follows_growth_across_restarts() {
    let mut t = TestLedger::new();
    let mut auditor = Auditor::new();

    for round in 0..6u32 {
        fill(t.ledger(), round * 3 + 1, 8);
        auditor.observe(t.ledger());
        t.restart();
        auditor.observe(t.ledger());
    }
    assert_eq!(auditor.pinned.len(), 12);
}

/// Every inclusion proof handed out checks against the auditor's own root.
#[test]
fn test_inclusion_against_pinned_root() {
    let t = TestLedger::new();
    fill(t.ledger(), 33, 8);
    let pinned = t.ledger().current_root();
    fill(t.ledger(), 10, 8);

    for index in 1..=pinned.index {
        let leaf = t.ledger().get_entry(index).unwrap().leaf_digest().unwrap();
        let proof = t.ledger().inclusion_at(index, pinned.index).unwrap();
        proof.verify(&leaf, &pinned).unwrap();
    }
}

/// Two ledgers that diverge at some index cannot prove consistency with
/// each other's roots.
#[test]
fn test_forked_history_is_detected() {
    let honest = Ledger::in_memory();
    let forked = Ledger::in_memory();
    for i in 0..10u32 {
        let key = format!("k{i}");
        honest.set(key.as_bytes(), "same").unwrap();
        let value = if i == 4 { "different" } else { "same" };
        forked.set(key.as_bytes(), value).unwrap();
    }

    let early = honest.root_at(3).unwrap();
    assert_eq!(forked.root_at(3).unwrap(), early);
    let pinned = honest.root_at(6).unwrap();
    assert_ne!(forked.root_at(6).unwrap(), pinned);

    let proof = forked.consistency_between(6, 10).unwrap();
    assert!(proof.verify(&pinned, &forked.current_root()).is_err());

    let err = forked
        .set_with_proof(b"k10", "x", Some(&pinned))
        .unwrap_err();
    assert!(matches!(err, LedgerError::RootMismatch(root) if root == pinned));
    assert_eq!(forked.size(), 10);
}

/// Rewriting a stored entry is caught when the ledger is reopened.
#[test]
fn test_rewritten_entry_fails_reopen() {
    let mut t = TestLedger::new();
    fill(t.ledger(), 20, 16);
    t.shutdown();

    t.with_store(|store| {
        let mut entry = stored_entry(store, 7);
        entry.key = b"key-forged".to_vec();
        store.put_entry(&entry).unwrap();
    });

    let err = t.try_reopen().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
}

fn stored_entry(store: &LedgerStore, index: u64) -> Entry {
    let bytes = store.get_raw_entry(index).unwrap().unwrap();
    postcard::from_bytes(&bytes).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any interleaving of writes and pins keeps every pinned root provably
    /// extended by the final tree.
    #[test]
    fn pinned_roots_stay_consistent(batches in prop::collection::vec(1usize..8, 1..12)) {
        let ledger = Ledger::in_memory();
        let mut auditor = Auditor::new();
        for (b, len) in batches.iter().enumerate() {
            let items: Vec<(String, String)> = (0..*len)
                .map(|i| (format!("b{b}-{i}"), format!("v{i}")))
                .collect();
            ledger
                .set_batch(items.iter().map(|(k, v)| (k.as_bytes(), v.as_str())))
                .unwrap();
            auditor.observe(&ledger);
        }
        prop_assert_eq!(auditor.replay(&ledger), ledger.current_root());
    }
}
