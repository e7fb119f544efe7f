//! MemTable implementation
//!
//! Skip-list backed multi-version table.

use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;

use super::{InternalKey, MemTableEntry};
use crate::wal::Operation;

/// Per-version bookkeeping overhead counted towards `size()`
const VERSION_OVERHEAD: usize = 8;

/// In-memory table of every retained version
#[derive(Debug, Default)]
pub struct MemTable {
    map: SkipMap<InternalKey, MemTableEntry>,

    /// Approximate size in bytes
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every operation of a batch under one seqno
    ///
    /// Operations are applied in order; a later operation on the same key
    /// replaces an earlier one, so the last write in a batch wins.
    /// Returns the approximate table size afterwards.
    pub fn apply(&self, seqno: u64, operations: &[Operation]) -> usize {
        for op in operations {
            let (key, entry) = match op {
                Operation::Put { key, value } => (
                    Bytes::copy_from_slice(key),
                    MemTableEntry::Value(Bytes::copy_from_slice(value)),
                ),
                Operation::Delete { key } => (Bytes::copy_from_slice(key), MemTableEntry::Tombstone),
            };
            self.insert(InternalKey::new(key, seqno), entry);
        }
        self.size()
    }

    /// Insert a single version
    pub fn insert(&self, key: InternalKey, entry: MemTableEntry) {
        let added = entry_size(&key, &entry);
        if let Some(old) = self.map.get(&key) {
            self.sub_size(entry_size(old.key(), old.value()));
        }
        self.map.insert(key, entry);
        self.size.fetch_add(added, Ordering::Relaxed);
    }

    /// Newest version of `key` visible at `snapshot`
    ///
    /// Returns:
    /// - `Some(Value)`: key live at the snapshot
    /// - `Some(Tombstone)`: key deleted at the snapshot
    /// - `None`: no version at or below the snapshot
    pub fn get(&self, key: &[u8], snapshot: u64) -> Option<MemTableEntry> {
        let target = InternalKey::new(Bytes::copy_from_slice(key), snapshot);
        let entry = self.map.lower_bound(Bound::Included(&target))?;
        if entry.key().user_key.as_ref() == key {
            Some(entry.value().clone())
        } else {
            None
        }
    }

    /// First live key within `prefix`, starting at `from`, as of `snapshot`
    ///
    /// Keys whose newest visible version is a tombstone are skipped. Returns
    /// `None` once the walk leaves the prefix range.
    pub fn seek(&self, from: Bound<&[u8]>, prefix: &[u8], snapshot: u64) -> Option<(Bytes, Bytes)> {
        let (start, excluded) = match from {
            Bound::Included(k) => (InternalKey::new(Bytes::copy_from_slice(k), snapshot), None),
            // (k, 0) sorts after every version of k
            Bound::Excluded(k) => (InternalKey::new(Bytes::copy_from_slice(k), 0), Some(k)),
            Bound::Unbounded => (InternalKey::new(Bytes::copy_from_slice(prefix), snapshot), None),
        };
        let lower = match excluded {
            Some(_) => Bound::Excluded(&start),
            None => Bound::Included(&start),
        };

        let mut decided: Option<Bytes> = None;
        for entry in self.map.range((lower, Bound::Unbounded)) {
            let ikey = entry.key();
            if !ikey.user_key.starts_with(prefix) {
                if ikey.user_key.as_ref() < prefix {
                    continue;
                }
                return None;
            }
            if ikey.seqno > snapshot {
                continue;
            }
            if excluded == Some(ikey.user_key.as_ref()) {
                continue;
            }
            if decided.as_ref() == Some(&ikey.user_key) {
                continue;
            }
            match entry.value() {
                MemTableEntry::Value(v) => return Some((ikey.user_key.clone(), v.clone())),
                MemTableEntry::Tombstone => decided = Some(ikey.user_key.clone()),
            }
        }
        None
    }

    /// Drop versions that no snapshot at or above `watermark` can read
    ///
    /// For each key the newest version at or below the watermark is the
    /// oldest one still needed; anything older goes. That base version goes
    /// too when it is a tombstone, but only after the versions below it, so
    /// a concurrent reader never sees an older value resurface.
    /// Returns the number of versions removed.
    pub fn prune(&self, watermark: u64) -> usize {
        let mut removed = 0;
        let mut current: Option<Bytes> = None;
        let mut base_seen = false;
        let mut pending_tombstone: Option<InternalKey> = None;

        for entry in self.map.iter() {
            let ikey = entry.key();
            if current.as_ref() != Some(&ikey.user_key) {
                removed += self.remove_pending(pending_tombstone.take());
                current = Some(ikey.user_key.clone());
                base_seen = false;
            }

            if ikey.seqno > watermark {
                continue;
            }

            if !base_seen {
                base_seen = true;
                if matches!(entry.value(), MemTableEntry::Tombstone) {
                    pending_tombstone = Some(ikey.clone());
                }
                continue;
            }

            if entry.remove() {
                self.sub_size(entry_size(ikey, entry.value()));
                removed += 1;
            }
        }
        removed += self.remove_pending(pending_tombstone.take());

        removed
    }

    fn remove_pending(&self, key: Option<InternalKey>) -> usize {
        let Some(key) = key else {
            return 0;
        };
        match self.map.remove(&key) {
            Some(entry) => {
                self.sub_size(entry_size(entry.key(), entry.value()));
                1
            }
            None => 0,
        }
    }

    fn sub_size(&self, amount: usize) {
        let _ = self
            .size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                Some(s.saturating_sub(amount))
            });
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Number of stored versions (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn entry_size(key: &InternalKey, entry: &MemTableEntry) -> usize {
    let value_len = match entry {
        MemTableEntry::Value(v) => v.len(),
        MemTableEntry::Tombstone => 0,
    };
    key.user_key.len() + value_len + VERSION_OVERHEAD
}
