//! Snapshots
//!
//! A snapshot pins one sequence number. Every read through it sees, per key,
//! the newest version at or below that seqno, no matter what commits after.
//!
//! ## Pinning
//! `SnapshotTracker` counts live snapshots per seqno. Publishing a new seqno
//! and pinning the latest one happen under the same mutex, so the pruning
//! watermark (`min_pinned_seqno`) can never pass a snapshot that is being
//! created concurrently.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{CfkvError, Result};
use crate::memtable::{MemTable, MemTableEntry};

/// Tracks the latest visible seqno and every pinned one
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    inner: Mutex<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    latest_seqno: u64,
    /// seqno → number of live snapshots pinned at it
    pinned: BTreeMap<u64, usize>,
}

impl SnapshotTracker {
    pub fn new(latest_seqno: u64) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                latest_seqno,
                pinned: BTreeMap::new(),
            }),
        }
    }

    /// Make `seqno` visible to snapshots created from now on
    pub fn publish(&self, seqno: u64) {
        let mut guard = self.inner.lock();
        guard.latest_seqno = guard.latest_seqno.max(seqno);
    }

    pub fn latest_seqno(&self) -> u64 {
        self.inner.lock().latest_seqno
    }

    /// Pin the latest seqno and return it
    pub fn pin_latest(&self) -> u64 {
        let mut guard = self.inner.lock();
        let seqno = guard.latest_seqno;
        *guard.pinned.entry(seqno).or_insert(0) += 1;
        seqno
    }

    /// Release one pin on `seqno`
    pub fn release(&self, seqno: u64) {
        let mut guard = self.inner.lock();
        if let Some(count) = guard.pinned.get_mut(&seqno) {
            *count -= 1;
            if *count == 0 {
                guard.pinned.remove(&seqno);
            }
        }
    }

    /// Oldest seqno any live snapshot may read (latest when none are pinned)
    pub fn min_pinned_seqno(&self) -> u64 {
        let guard = self.inner.lock();
        guard
            .pinned
            .keys()
            .next()
            .copied()
            .unwrap_or(guard.latest_seqno)
    }

    /// Number of live snapshots
    pub fn live_count(&self) -> usize {
        self.inner.lock().pinned.values().sum()
    }
}

/// A read-only, point-in-time view of the engine
///
/// Released when dropped. Reads after the engine is closed fail with
/// `EngineClosed`.
#[derive(Debug)]
pub struct Snapshot {
    seqno: u64,
    memtable: Arc<MemTable>,
    tracker: Arc<SnapshotTracker>,
    closed: Arc<AtomicBool>,
}

impl Snapshot {
    pub(crate) fn pin(
        memtable: Arc<MemTable>,
        tracker: Arc<SnapshotTracker>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        let seqno = tracker.pin_latest();
        Self {
            seqno,
            memtable,
            tracker,
            closed,
        }
    }

    /// The pinned sequence number
    pub fn seqno(&self) -> u64 {
        self.seqno
    }

    /// Point read of an encoded key; `Ok(None)` when absent or deleted
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.check_open()?;
        match self.memtable.get(key, self.seqno) {
            Some(MemTableEntry::Value(value)) => Ok(Some(value)),
            Some(MemTableEntry::Tombstone) | None => Ok(None),
        }
    }

    /// Forward iterator over the encoded keys starting with `prefix`
    pub fn iter(&self, prefix: &[u8]) -> Result<EngineIterator<'_>> {
        self.check_open()?;
        Ok(EngineIterator {
            snapshot: self,
            prefix: prefix.to_vec(),
            state: IterState::Unseeked,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CfkvError::EngineClosed);
        }
        Ok(())
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.tracker.release(self.seqno);
    }
}

/// Position of an iterator
#[derive(Debug, Clone, PartialEq)]
pub enum IterState {
    /// Created, not yet positioned
    Unseeked,
    /// Positioned on a live entry
    Valid { key: Bytes, value: Bytes },
    /// Ran past the last key of its range
    Exhausted,
}

/// Ordered cursor over one key prefix of a snapshot
///
/// `Unseeked → Valid | Exhausted` on seek, `Valid → Valid | Exhausted` on
/// advance. Release is `drop`; the borrow on the snapshot keeps the snapshot
/// pinned while the iterator lives.
#[derive(Debug)]
pub struct EngineIterator<'a> {
    snapshot: &'a Snapshot,
    prefix: Vec<u8>,
    state: IterState,
}

impl<'a> EngineIterator<'a> {
    /// Position on the first key ≥ `target` within the prefix
    ///
    /// A target below the prefix range is clamped to its start.
    pub fn seek(&mut self, target: &[u8]) -> Result<()> {
        let from = if target < self.prefix.as_slice() {
            Bound::Unbounded
        } else {
            Bound::Included(target)
        };
        self.position(from)
    }

    /// Position on the first key of the prefix
    pub fn seek_to_first(&mut self) -> Result<()> {
        self.position(Bound::Unbounded)
    }

    /// Step to the next key; a no-op once exhausted
    pub fn advance(&mut self) -> Result<()> {
        match &self.state {
            IterState::Unseeked => Err(CfkvError::IteratorNotSeeked),
            IterState::Exhausted => Ok(()),
            IterState::Valid { key, .. } => {
                let key = key.clone();
                self.position(Bound::Excluded(key.as_ref()))
            }
        }
    }

    fn position(&mut self, from: Bound<&[u8]>) -> Result<()> {
        self.snapshot.check_open()?;
        self.state = match self
            .snapshot
            .memtable
            .seek(from, &self.prefix, self.snapshot.seqno)
        {
            Some((key, value)) => IterState::Valid { key, value },
            None => IterState::Exhausted,
        };
        Ok(())
    }

    /// True when positioned on an entry
    pub fn valid(&self) -> bool {
        matches!(self.state, IterState::Valid { .. })
    }

    /// Current encoded key, if valid
    pub fn key(&self) -> Option<&Bytes> {
        match &self.state {
            IterState::Valid { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Current value, if valid
    pub fn value(&self) -> Option<&Bytes> {
        match &self.state {
            IterState::Valid { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn state(&self) -> &IterState {
        &self.state
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}
