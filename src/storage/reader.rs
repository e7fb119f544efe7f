//! Standalone storage reader

use std::sync::Arc;

use bytes::Bytes;

use super::{CfIterator, StorageReader};
use crate::codec::KeyCodec;
use crate::error::Result;
use crate::snapshot::Snapshot;

/// Reader owning one engine snapshot
#[derive(Debug)]
pub struct StandaloneReader {
    snapshot: Snapshot,
    codec: Arc<KeyCodec>,
}

impl StandaloneReader {
    pub(crate) fn new(snapshot: Snapshot, codec: Arc<KeyCodec>) -> Self {
        Self { snapshot, codec }
    }

    /// Seqno this reader is pinned at
    pub fn seqno(&self) -> u64 {
        self.snapshot.seqno()
    }
}

impl StorageReader for StandaloneReader {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Bytes>> {
        let encoded = self.codec.encode(cf, key)?;
        self.snapshot.get(&encoded)
    }

    fn iter_cf(&self, cf: &str) -> Result<CfIterator<'_>> {
        let prefix = self.codec.prefix(cf)?;
        Ok(CfIterator::new(self.snapshot.iter(prefix)?))
    }

    fn close(self) {
        // Dropping the snapshot unpins it
    }
}
