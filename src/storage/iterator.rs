//! Column family iterator

use bytes::Bytes;

use crate::error::Result;
use crate::snapshot::{EngineIterator, IterState};

/// Forward iterator over one column family of a reader's snapshot
///
/// Keys are returned without the column family prefix. Starts unpositioned;
/// call `seek` or `seek_to_first` before reading. Becomes invalid once it
/// runs past the last key of the family.
#[derive(Debug)]
pub struct CfIterator<'a> {
    inner: EngineIterator<'a>,
}

impl<'a> CfIterator<'a> {
    pub(crate) fn new(inner: EngineIterator<'a>) -> Self {
        Self { inner }
    }

    /// Position on the first key ≥ `key`
    pub fn seek(&mut self, key: &[u8]) -> Result<()> {
        let prefix = self.inner.prefix();
        let mut target = Vec::with_capacity(prefix.len() + key.len());
        target.extend_from_slice(prefix);
        target.extend_from_slice(key);
        self.inner.seek(&target)
    }

    pub fn seek_to_first(&mut self) -> Result<()> {
        self.inner.seek_to_first()
    }

    /// Move to the next key
    ///
    /// Fails with `IteratorNotSeeked` before the first seek; does nothing
    /// once exhausted.
    pub fn advance(&mut self) -> Result<()> {
        self.inner.advance()
    }

    pub fn valid(&self) -> bool {
        self.inner.valid()
    }

    /// True once the iterator has run off the end of the family
    pub fn is_exhausted(&self) -> bool {
        matches!(self.inner.state(), IterState::Exhausted)
    }

    /// Current logical key
    pub fn key(&self) -> Option<&[u8]> {
        let prefix_len = self.inner.prefix().len();
        self.inner.key().map(|k| &k[prefix_len..])
    }

    /// Current value
    pub fn value(&self) -> Option<&Bytes> {
        self.inner.value()
    }

    /// Current `(key, value)`
    pub fn item(&self) -> Option<(&[u8], &Bytes)> {
        Some((self.key()?, self.value()?))
    }

    /// Release the iterator
    pub fn close(self) {}
}
