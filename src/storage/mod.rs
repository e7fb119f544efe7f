//! Storage Module
//!
//! Column-family storage on top of the engine.
//!
//! ## Responsibilities
//! - Translate `(cf, key)` operations into encoded engine operations
//! - Per-request readers bound to one snapshot
//! - Atomic write batches, pooled for reuse
//! - Bounded forward scans
//!
//! ## Lifecycle
//! ```text
//!   request ──► storage.reader() ──► get_cf / iter_cf ... ──► close()
//!                    │                                          │
//!                    └──────── snapshot pinned ─────────────────┘
//!
//!   request ──► storage.write(&[Modify]) ──► pooled WriteBatch ──► commit
//! ```

mod batch;
mod iterator;
mod reader;
mod scan;
mod standalone;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use batch::{PooledBatch, WriteBatch, WriteBatchPool};
pub use iterator::CfIterator;
pub use reader::StandaloneReader;
pub use scan::{raw_scan, KvPair};
pub use standalone::StandaloneStorage;

/// A single logical modification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modify {
    /// Set `key` in `cf` to `value`
    Put {
        cf: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Remove `key` from `cf`
    Delete { cf: String, key: Vec<u8> },
}

impl Modify {
    pub fn put(cf: impl Into<String>, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Modify::Put {
            cf: cf.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(cf: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Modify::Delete {
            cf: cf.into(),
            key: key.into(),
        }
    }

    pub fn cf(&self) -> &str {
        match self {
            Modify::Put { cf, .. } | Modify::Delete { cf, .. } => cf,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Modify::Put { key, .. } | Modify::Delete { key, .. } => key,
        }
    }

    /// `None` for deletes
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Modify::Put { value, .. } => Some(value),
            Modify::Delete { .. } => None,
        }
    }
}

/// A column-family key-value store
pub trait Storage: Send + Sync {
    type Reader: StorageReader;

    fn start(&self) -> Result<()>;

    /// Flush and release the underlying engine; idempotent
    fn stop(&self) -> Result<()>;

    /// Apply every modification atomically
    fn write(&self, batch: &[Modify]) -> Result<()>;

    /// Open a reader pinned at the current state
    fn reader(&self) -> Result<Self::Reader>;
}

/// A consistent, read-only view of a `Storage`
///
/// Every read sees the state as of the reader's creation. `close` releases
/// the view; dropping the reader does the same.
pub trait StorageReader {
    /// Point lookup; `Ok(None)` when the key is absent
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Bytes>>;

    /// Independent, unpositioned iterator over `cf`
    fn iter_cf(&self, cf: &str) -> Result<CfIterator<'_>>;

    fn close(self)
    where
        Self: Sized;
}
