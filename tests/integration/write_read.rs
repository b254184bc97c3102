//! Integration test: write/read.
//!
//! On-disk ledger. Write values of varying sizes, read them back by key and
//! by index, and check every read against a proof.

use cairn_integration_tests::{TestLedger, fill, test_data, test_data_seeded};
use cairn_ledger::{ScanMode, StructuredValue, Value};

/// Write 100 values of varying sizes (1 byte to ~100 KB), read each back
/// with a proof.
#[test]
fn test_100_values_varying_sizes() {
    let t = TestLedger::new();
    let ledger = t.ledger();

    let mut written = Vec::new();
    for i in 0..100u32 {
        let size = 1 + i as usize * 1000;
        let value = test_data_seeded(size, i + 1);
        let key = format!("obj-{i:03}");
        let index = ledger.set(key.as_bytes(), value.clone()).unwrap();
        assert_eq!(index, u64::from(i) + 1);
        written.push((key, value));
    }

    for (key, expected) in &written {
        let proven = ledger.get_with_proof(key.as_bytes()).unwrap();
        proven.verify().unwrap();
        assert_eq!(proven.item.bytes(), Some(expected.as_slice()), "{key}");
        assert_eq!(proven.root, ledger.current_root());
    }
}

/// Overwrites keep every version; reads by key see the latest.
#[test]
fn test_overwrite_keeps_history() {
    let t = TestLedger::new();
    let ledger = t.ledger();

    for round in 0..5u32 {
        ledger.set(b"counter", test_data_seeded(64, round)).unwrap();
    }

    let latest = ledger.get(b"counter").unwrap();
    assert_eq!(latest.index, 5);
    assert_eq!(latest.bytes(), Some(test_data_seeded(64, 4).as_slice()));

    let history = ledger.history(b"counter").unwrap();
    let indices: Vec<u64> = history.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);

    let first = ledger.get_at_index(1).unwrap();
    assert_eq!(first.bytes(), Some(test_data_seeded(64, 0).as_slice()));
}

/// A batch lands under contiguous indices and every member is provable.
#[test]
fn test_batch_then_prove_each_member() {
    let t = TestLedger::new();
    let ledger = t.ledger();
    ledger.set(b"before", test_data(10)).unwrap();

    let items: Vec<(String, Vec<u8>)> = (0..50u32)
        .map(|i| (format!("batch-{i:02}"), test_data_seeded(128, i)))
        .collect();
    let (first, last) = ledger.set_batch(items.iter().map(|(k, v)| (k, v.clone()))).unwrap();
    assert_eq!((first, last), (2, 51));

    for (offset, (key, value)) in items.iter().enumerate() {
        let proven = ledger.get_at_index_with_proof(first + offset as u64).unwrap();
        proven.verify().unwrap();
        assert_eq!(proven.item.key, key.as_bytes());
        assert_eq!(proven.item.bytes(), Some(value.as_slice()));
    }
}

/// Structured values, references and sorted sets share one log.
#[test]
fn test_mixed_entry_kinds_share_one_log() {
    let t = TestLedger::new();
    let ledger = t.ledger();

    ledger
        .set(b"doc", StructuredValue::new(1_700_000_000, b"body".to_vec()))
        .unwrap();
    ledger.set(b"player:1", "alice").unwrap();
    ledger.reference(b"mvp", b"player:1").unwrap();
    ledger.sorted_add(b"leaderboard", 42.0, b"player:1").unwrap();
    assert_eq!(ledger.size(), 4);

    let doc = ledger.get_structured(b"doc").unwrap();
    assert_eq!(doc.timestamp, 1_700_000_000);

    let mvp = ledger.get(b"mvp").unwrap();
    assert_eq!(mvp.key, b"player:1");
    assert_eq!(mvp.value, Some(Value::from("alice")));
    assert_eq!(mvp.target_index, Some(2));

    let board = ledger.sorted_scan(b"leaderboard", None, 10, false).unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].member, b"player:1");
    assert_eq!(board[0].index, 4);

    ledger.verify_integrity().unwrap();
}

/// Prefix scans and pages agree with what was written.
#[test]
fn test_scan_and_pages_cover_every_key() {
    let t = TestLedger::new();
    let ledger = t.ledger();
    let written = fill(ledger, 40, 32);

    let items = ledger.scan_prefix(b"key-", None, 1000, ScanMode::Latest).unwrap();
    assert_eq!(items.len(), written.len());
    for (item, (key, value)) in items.iter().zip(&written) {
        assert_eq!(item.key, key.as_bytes());
        assert_eq!(item.bytes(), Some(value.as_slice()));
    }

    let mut paged = Vec::new();
    for page in 1.. {
        let items = ledger.paginated_scan(page, 7).unwrap();
        if items.is_empty() {
            break;
        }
        paged.extend(items.into_iter().map(|i| i.key));
    }
    let keys: Vec<Vec<u8>> = written.iter().map(|(k, _)| k.as_bytes().to_vec()).collect();
    assert_eq!(paged, keys);
    assert_eq!(ledger.count(b"key-"), 40);
}
