//! MemTable Module
//!
//! In-memory, multi-version ordered store for every committed batch.
//!
//! ## Responsibilities
//! - Keep every version a live snapshot may still read
//! - Answer point lookups and ordered seeks as of a snapshot seqno
//! - Prune versions no snapshot can see any more
//!
//! ## Ordering
//! Entries are ordered by `(user_key ASC, seqno DESC)`. Seeking to
//! `(key, snapshot)` therefore lands on the newest version of `key` that the
//! snapshot may see, or on the next key when there is none.
//!
//! ## Data Structure Choice
//! A lock-free skip list: readers never block the single writer, and pruning
//! can unlink entries while iterations are in flight.

mod table;

use std::cmp::Ordering;

use bytes::Bytes;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    /// A live value
    Value(Bytes),

    /// A tombstone (deleted key)
    Tombstone,
}

/// Versioned key: `(user_key, seqno)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    pub user_key: Bytes,
    pub seqno: u64,
}

impl InternalKey {
    pub fn new(user_key: Bytes, seqno: u64) -> Self {
        Self { user_key, seqno }
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.user_key
            .cmp(&other.user_key)
            .then_with(|| other.seqno.cmp(&self.seqno))
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
