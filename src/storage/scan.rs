//! Bounded forward scans

use serde::{Deserialize, Serialize};

use super::StorageReader;
use crate::error::Result;

/// A logical key and its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Collect up to `limit` entries of `cf`, starting at the first key ≥ `start_key`
///
/// Stops early when the family runs out. A `start_key` that isn't present
/// is fine; the scan starts at the next key after it. `cf` is always
/// resolved, so an unknown family fails even when `limit == 0`; a zero limit
/// then returns nothing without positioning the iterator.
pub fn raw_scan<R: StorageReader>(
    reader: &R,
    cf: &str,
    start_key: &[u8],
    limit: usize,
) -> Result<Vec<KvPair>> {
    let mut iter = reader.iter_cf(cf)?;
    if limit == 0 {
        iter.close();
        return Ok(Vec::new());
    }

    iter.seek(start_key)?;

    let mut kvs = Vec::new();
    while kvs.len() < limit {
        let Some((key, value)) = iter.item() else {
            break;
        };
        kvs.push(KvPair {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        iter.advance()?;
    }
    iter.close();

    Ok(kvs)
}
