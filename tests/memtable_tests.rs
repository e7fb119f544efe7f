//! Tests for the multi-version MemTable
//!
//! These tests verify:
//! - Point lookups see exactly the versions at or below a snapshot
//! - Ordered seeks skip deleted keys and stay within a prefix
//! - Pruning only removes versions no snapshot at the watermark can read

use std::ops::Bound;

use bytes::Bytes;
use cfkv::memtable::{InternalKey, MemTable, MemTableEntry};
use cfkv::wal::Operation;

// =============================================================================
// Helper Functions
// =============================================================================

fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn delete(key: &str) -> Operation {
    Operation::Delete {
        key: key.as_bytes().to_vec(),
    }
}

fn value(v: &str) -> Option<MemTableEntry> {
    Some(MemTableEntry::Value(Bytes::copy_from_slice(v.as_bytes())))
}

fn seek_all(table: &MemTable, prefix: &[u8], snapshot: u64) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut next = table.seek(Bound::Included(prefix), prefix, snapshot);
    while let Some((k, v)) = next {
        out.push((
            String::from_utf8(k.to_vec()).unwrap(),
            String::from_utf8(v.to_vec()).unwrap(),
        ));
        next = table.seek(Bound::Excluded(k.as_ref()), prefix, snapshot);
    }
    out
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_internal_key_ordering() {
    let a5 = InternalKey::new(Bytes::from_static(b"a"), 5);
    let a3 = InternalKey::new(Bytes::from_static(b"a"), 3);
    let b9 = InternalKey::new(Bytes::from_static(b"b"), 9);

    // Newer versions of the same key sort first
    assert!(a5 < a3);
    assert!(a3 < b9);
    assert!(a5 < b9);
}

// =============================================================================
// Get Tests
// =============================================================================

#[test]
fn test_get_respects_snapshot() {
    let table = MemTable::new();
    table.apply(1, &[put("a", "1")]);
    table.apply(2, &[put("a", "2")]);
    table.apply(3, &[delete("a")]);

    assert_eq!(table.get(b"a", 0), None);
    assert_eq!(table.get(b"a", 1), value("1"));
    assert_eq!(table.get(b"a", 2), value("2"));
    assert_eq!(table.get(b"a", 3), Some(MemTableEntry::Tombstone));
    assert_eq!(table.get(b"a", 100), Some(MemTableEntry::Tombstone));
    assert_eq!(table.get(b"b", 100), None);
}

#[test]
fn test_get_does_not_match_neighbouring_key() {
    let table = MemTable::new();
    table.apply(1, &[put("ab", "x")]);

    assert_eq!(table.get(b"a", 10), None);
    assert_eq!(table.get(b"abc", 10), None);
}

#[test]
fn test_last_write_in_batch_wins() {
    let table = MemTable::new();
    table.apply(1, &[put("k", "first"), put("k", "second")]);
    assert_eq!(table.get(b"k", 1), value("second"));
    assert_eq!(table.entry_count(), 1);

    table.apply(2, &[put("k", "third"), delete("k")]);
    assert_eq!(table.get(b"k", 2), Some(MemTableEntry::Tombstone));

    table.apply(3, &[delete("k"), put("k", "back")]);
    assert_eq!(table.get(b"k", 3), value("back"));
}

// =============================================================================
// Seek Tests
// =============================================================================

#[test]
fn test_seek_within_prefix() {
    let table = MemTable::new();
    table.apply(
        1,
        &[put("p/a", "1"), put("p/b", "2"), put("q/a", "x"), put("o/z", "y")],
    );

    assert_eq!(
        seek_all(&table, b"p/", 1),
        vec![("p/a".into(), "1".into()), ("p/b".into(), "2".into())]
    );
    assert!(seek_all(&table, b"r/", 1).is_empty());
}

#[test]
fn test_seek_skips_tombstones_and_future_versions() {
    let table = MemTable::new();
    table.apply(1, &[put("p/a", "1"), put("p/b", "1"), put("p/c", "1")]);
    table.apply(2, &[delete("p/b")]);
    table.apply(3, &[put("p/d", "3"), put("p/a", "3")]);

    assert_eq!(
        seek_all(&table, b"p/", 2),
        vec![("p/a".into(), "1".into()), ("p/c".into(), "1".into())]
    );
    assert_eq!(
        seek_all(&table, b"p/", 3),
        vec![
            ("p/a".into(), "3".into()),
            ("p/c".into(), "1".into()),
            ("p/d".into(), "3".into())
        ]
    );
}

#[test]
fn test_seek_unbounded_starts_at_prefix() {
    let table = MemTable::new();
    table.apply(1, &[put("a", "0"), put("p/a", "1")]);

    let (k, v) = table.seek(Bound::Unbounded, b"p/", 1).unwrap();
    assert_eq!(k.as_ref(), b"p/a");
    assert_eq!(v.as_ref(), b"1");
}

#[test]
fn test_seek_from_middle() {
    let table = MemTable::new();
    table.apply(1, &[put("p/a", "1"), put("p/c", "3")]);

    let (k, _) = table.seek(Bound::Included(b"p/b"), b"p/", 1).unwrap();
    assert_eq!(k.as_ref(), b"p/c");
    assert!(table.seek(Bound::Excluded(b"p/c"), b"p/", 1).is_none());
}

// =============================================================================
// Prune Tests
// =============================================================================

#[test]
fn test_prune_keeps_base_version() {
    let table = MemTable::new();
    table.apply(1, &[put("a", "1")]);
    table.apply(2, &[put("a", "2")]);
    table.apply(3, &[put("a", "3")]);
    table.apply(4, &[put("a", "4")]);

    let removed = table.prune(2);
    assert_eq!(removed, 1);
    assert_eq!(table.entry_count(), 3);

    // Everything at or above the watermark still reads the same
    assert_eq!(table.get(b"a", 2), value("2"));
    assert_eq!(table.get(b"a", 3), value("3"));
    assert_eq!(table.get(b"a", 4), value("4"));
}

#[test]
fn test_prune_removes_deleted_keys() {
    let table = MemTable::new();
    table.apply(1, &[put("a", "1"), put("b", "1")]);
    table.apply(2, &[delete("a")]);

    let removed = table.prune(2);
    assert_eq!(removed, 2);
    assert_eq!(table.get(b"a", 2), None);
    assert_eq!(table.get(b"b", 2), value("1"));
    assert_eq!(table.entry_count(), 1);
}

#[test]
fn test_prune_keeps_tombstone_above_watermark() {
    let table = MemTable::new();
    table.apply(1, &[put("a", "1")]);
    table.apply(5, &[delete("a")]);

    assert_eq!(table.prune(3), 0);
    assert_eq!(table.get(b"a", 3), value("1"));
    assert_eq!(table.get(b"a", 5), Some(MemTableEntry::Tombstone));
}

#[test]
fn test_size_tracks_contents() {
    let table = MemTable::new();
    assert!(table.is_empty());
    assert_eq!(table.size(), 0);

    table.apply(1, &[put("a", "1")]);
    table.apply(2, &[put("a", "22")]);
    let before = table.size();
    assert!(before > 0);

    table.prune(2);
    assert!(table.size() < before);
}
