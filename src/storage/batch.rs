//! Write batches and the batch pool
//!
//! A `WriteBatch` collects encoded operations and hands them to the engine in
//! one atomic commit. Batches are recycled through a `WriteBatchPool`; a
//! recycled batch is always empty and owns none of the byte buffers of the
//! batches committed through it before.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use super::Modify;
use crate::codec::KeyCodec;
use crate::engine::Engine;
use crate::error::Result;
use crate::wal::Operation;

/// Batches whose operation list grew past this are shrunk on reset, so one
/// huge request doesn't pin memory in the pool forever.
const MAX_RETAINED_CAPACITY: usize = 1024;

/// An ordered list of puts and deletes across column families
#[derive(Debug)]
pub struct WriteBatch {
    codec: Arc<KeyCodec>,
    operations: Vec<Operation>,
    size: usize,
}

impl WriteBatch {
    pub fn new(codec: Arc<KeyCodec>) -> Self {
        Self {
            codec,
            operations: Vec::new(),
            size: 0,
        }
    }

    /// Queue a put; key and value are copied
    pub fn put_cf(&mut self, cf: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let op = Operation::Put {
            key: self.codec.encode(cf, key)?,
            value: value.to_vec(),
        };
        self.push(op);
        Ok(())
    }

    /// Queue a delete; key is copied
    pub fn delete_cf(&mut self, cf: &str, key: &[u8]) -> Result<()> {
        let op = Operation::Delete {
            key: self.codec.encode(cf, key)?,
        };
        self.push(op);
        Ok(())
    }

    /// Queue a logical modification
    pub fn set_modify(&mut self, modify: &Modify) -> Result<()> {
        match modify {
            Modify::Put { cf, key, value } => self.put_cf(cf, key, value),
            Modify::Delete { cf, key } => self.delete_cf(cf, key),
        }
    }

    fn push(&mut self, op: Operation) {
        self.size += op.size();
        self.operations.push(op);
    }

    /// Commit everything queued so far as one atomic unit, then clear
    ///
    /// The batch is cleared whether or not the commit succeeds. Committing an
    /// empty batch does nothing.
    pub fn commit(&mut self, engine: &Engine) -> Result<()> {
        let result = engine.commit_batch(&self.operations);
        self.reset();
        result
    }

    /// Drop every queued operation
    pub fn reset(&mut self) {
        self.operations.clear();
        if self.operations.capacity() > MAX_RETAINED_CAPACITY {
            self.operations.shrink_to(MAX_RETAINED_CAPACITY);
        }
        self.size = 0;
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Approximate payload size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

/// Bounded, lock-free pool of reusable write batches
///
/// Safe to borrow from and return to concurrently. When the pool is empty a
/// new batch is allocated; when it is full a returned batch is dropped.
#[derive(Debug)]
pub struct WriteBatchPool {
    codec: Arc<KeyCodec>,
    idle: ArrayQueue<WriteBatch>,
}

impl WriteBatchPool {
    /// Create a pool keeping at most `capacity` idle batches (minimum 1)
    pub fn new(codec: Arc<KeyCodec>, capacity: usize) -> Self {
        Self {
            codec,
            idle: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Borrow an empty batch; it returns to the pool when dropped
    pub fn get(&self) -> PooledBatch<'_> {
        let batch = self
            .idle
            .pop()
            .unwrap_or_else(|| WriteBatch::new(Arc::clone(&self.codec)));
        PooledBatch {
            batch: Some(batch),
            pool: self,
        }
    }

    fn put_back(&self, mut batch: WriteBatch) {
        batch.reset();
        // A full pool just lets the batch go
        let _ = self.idle.push(batch);
    }

    /// Number of idle batches
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }
}

/// A batch on loan from a `WriteBatchPool`
#[derive(Debug)]
pub struct PooledBatch<'a> {
    batch: Option<WriteBatch>,
    pool: &'a WriteBatchPool,
}

impl Deref for PooledBatch<'_> {
    type Target = WriteBatch;

    fn deref(&self) -> &WriteBatch {
        self.batch.as_ref().expect("batch present until drop")
    }
}

impl DerefMut for PooledBatch<'_> {
    fn deref_mut(&mut self) -> &mut WriteBatch {
        self.batch.as_mut().expect("batch present until drop")
    }
}

impl Drop for PooledBatch<'_> {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.pool.put_back(batch);
        }
    }
}
