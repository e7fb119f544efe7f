//! Single-node storage
//!
//! All data lives in one local engine. Nothing is shared with other nodes.

use std::sync::Arc;

use super::{Modify, PooledBatch, StandaloneReader, Storage, WriteBatchPool};
use crate::codec::KeyCodec;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

/// `Storage` backed by a single local engine
///
/// Owns the engine handle and the batch pool. Share it between request
/// handlers behind an `Arc`.
pub struct StandaloneStorage {
    engine: Engine,
    codec: Arc<KeyCodec>,
    batch_pool: WriteBatchPool,
}

impl StandaloneStorage {
    /// Open (or create) the store described by `config`
    pub fn new(config: Config) -> Result<Self> {
        let codec = Arc::new(KeyCodec::new(&config.column_families)?);
        let batch_pool = WriteBatchPool::new(Arc::clone(&codec), config.batch_pool_capacity);
        let engine = Engine::open(config)?;

        Ok(Self {
            engine,
            codec,
            batch_pool,
        })
    }

    /// Borrow an empty batch from the pool
    pub fn write_batch(&self) -> PooledBatch<'_> {
        self.batch_pool.get()
    }

    /// Commit a batch built with `write_batch()`
    pub fn commit(&self, batch: &mut PooledBatch<'_>) -> Result<()> {
        batch.commit(&self.engine)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    pub fn batch_pool(&self) -> &WriteBatchPool {
        &self.batch_pool
    }
}

impl Storage for StandaloneStorage {
    type Reader = StandaloneReader;

    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.engine.close()
    }

    fn write(&self, batch: &[Modify]) -> Result<()> {
        let mut wb = self.batch_pool.get();
        for modify in batch {
            wb.set_modify(modify)?;
        }
        wb.commit(&self.engine)
    }

    fn reader(&self) -> Result<StandaloneReader> {
        let snapshot = self.engine.begin_read()?;
        Ok(StandaloneReader::new(snapshot, Arc::clone(&self.codec)))
    }
}
