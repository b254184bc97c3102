//! Torture test for the ledger.
//!
//! Combines concurrent writers and readers with proof checks:
//! - Many writers appending single values and batches at once
//! - Readers pinning roots and verifying proofs while writes land
//! - A restart at the end must reproduce the same root

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use cairn_integration_tests::{TestLedger, test_data_seeded};
use cairn_ledger::ScanMode;

const WRITERS: u32 = 4;
const WRITES_PER_WRITER: u32 = 100;

/// Concurrent writers get distinct, dense indices and nothing is lost.
#[test]
fn test_concurrent_writers_dense_indices() {
    let mut t = TestLedger::new();

    let indices: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let ledger = t.ledger();
                s.spawn(move || {
                    (0..WRITES_PER_WRITER)
                        .map(|i| {
                            let key = format!("w{w}-{i:03}");
                            ledger
                                .set(key.as_bytes(), test_data_seeded(64, w * 1000 + i))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let total = u64::from(WRITERS * WRITES_PER_WRITER);
    let unique: HashSet<u64> = indices.iter().copied().collect();
    assert_eq!(unique.len() as u64, total);
    assert_eq!(unique, (1..=total).collect::<HashSet<_>>());

    for w in 0..WRITERS {
        for i in 0..WRITES_PER_WRITER {
            let key = format!("w{w}-{i:03}");
            let item = t.ledger().get(key.as_bytes()).unwrap();
            assert_eq!(item.bytes(), Some(test_data_seeded(64, w * 1000 + i).as_slice()));
        }
    }

    let root = t.ledger().verify_integrity().unwrap();
    t.restart();
    assert_eq!(t.ledger().current_root(), root);
}

/// Batches from different writers never interleave.
#[test]
fn test_concurrent_batches_stay_contiguous() {
    let t = TestLedger::new();
    let ledger = t.ledger();

    let ranges: Vec<(u32, u64, u64)> = thread::scope(|s| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                s.spawn(move || {
                    (0..10u32)
                        .map(|b| {
                            let items: Vec<(String, Vec<u8>)> = (0..5u32)
                                .map(|i| (format!("w{w}-b{b}-{i}"), vec![w as u8; 8]))
                                .collect();
                            let (first, last) = ledger.set_batch(items).unwrap();
                            (w, first, last)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    for (w, first, last) in ranges {
        assert_eq!(last - first, 4);
        for index in first..=last {
            let entry = ledger.get_entry(index).unwrap();
            let prefix = format!("w{w}-");
            assert!(entry.key.starts_with(prefix.as_bytes()), "{index} not from writer {w}");
        }
    }
    assert_eq!(ledger.size(), u64::from(WRITERS) * 50);
}

/// Readers verifying proofs never observe a root that is not backed by
/// committed entries.
#[test]
fn test_readers_verify_while_writers_append() {
    let t = TestLedger::new();
    let ledger = t.ledger();
    ledger.set(b"seed", "0").unwrap();

    let stop = AtomicBool::new(false);
    let checks = AtomicUsize::new(0);

    thread::scope(|s| {
        for r in 0..3u64 {
            let (stop, checks) = (&stop, &checks);
            s.spawn(move || {
                let mut last_root = ledger.current_root();
                while !stop.load(Ordering::Acquire) {
                    let proven = ledger.get_with_proof(b"seed").unwrap();
                    proven.verify().unwrap();

                    let root = ledger.current_root();
                    let proof = ledger.consistency_between(last_root.index, root.index).unwrap();
                    proof.verify(&last_root, &ledger.root_at(root.index).unwrap()).unwrap();

                    let index = 1 + (r * 7 + root.index) % root.index;
                    let leaf = ledger.get_entry(index).unwrap().leaf_digest().unwrap();
                    ledger
                        .inclusion_at(index, root.index)
                        .unwrap()
                        .verify(&leaf, &root)
                        .unwrap();

                    last_root = root;
                    checks.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        s.spawn(|| {
            for i in 0..300u32 {
                let key = format!("bulk-{i}");
                ledger.set(key.as_bytes(), test_data_seeded(32, i)).unwrap();
                if i % 50 == 0 {
                    ledger.set(b"seed", format!("{i}").as_str()).unwrap();
                }
            }
            stop.store(true, Ordering::Release);
        });
    });

    assert!(checks.load(Ordering::Relaxed) > 0);
    assert_eq!(ledger.size(), 1 + 300 + 6);
    ledger.verify_integrity().unwrap();
}

/// Every scan mode agrees with the history of every key after mixed load.
#[test]
fn test_scan_modes_agree_after_mixed_load() {
    let t = TestLedger::new();
    let ledger = t.ledger();

    thread::scope(|s| {
        for w in 0..WRITERS {
            s.spawn(move || {
                for i in 0..50u32 {
                    let key = format!("shared-{}", i % 10);
                    ledger.set(key.as_bytes(), format!("w{w}-{i}").as_str()).unwrap();
                    if i % 10 == 0 {
                        ledger
                            .sorted_add(b"scores", f64::from(w * 100 + i), key.as_bytes())
                            .unwrap();
                    }
                }
            });
        }
    });

    let latest = ledger.scan_prefix(b"shared-", None, 100, ScanMode::Latest).unwrap();
    assert_eq!(latest.len(), 10);
    let all = ledger
        .scan_prefix(b"shared-", None, 10_000, ScanMode::AllVersions)
        .unwrap();
    assert_eq!(all.len(), (WRITERS * 50) as usize);

    for item in &latest {
        let history = ledger.history(&item.key).unwrap();
        assert_eq!(history.last().unwrap().index, item.index);
    }

    let scores = ledger.sorted_scan(b"scores", None, 100, false).unwrap();
    assert_eq!(scores.len(), (WRITERS * 5) as usize);
    assert!(scores.windows(2).all(|w| w[0].score <= w[1].score));
}
