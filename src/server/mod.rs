//! Server Module
//!
//! The raw key-value API: get, put, delete and scan against named column
//! families. Transport-agnostic; an RPC layer decodes requests, calls these
//! methods and encodes the responses.
//!
//! Each read request gets its own reader, released before the method
//! returns, on success and on error alike.

mod kvrpc;

use std::sync::Arc;

use crate::error::Result;
use crate::storage::{raw_scan, Modify, Storage, StorageReader};

pub use kvrpc::{
    RawDeleteRequest, RawDeleteResponse, RawGetRequest, RawGetResponse, RawPutRequest,
    RawPutResponse, RawScanRequest, RawScanResponse,
};

/// Raw API handler over any `Storage`
pub struct Server<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for Server<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> Server<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Value of `req.key` in `req.cf`; a miss sets `not_found`
    pub fn raw_get(&self, req: RawGetRequest) -> Result<RawGetResponse> {
        let reader = self.storage.reader()?;
        let value = reader.get_cf(&req.cf, &req.key)?;
        reader.close();

        Ok(match value {
            Some(value) => RawGetResponse {
                value: value.to_vec(),
                not_found: false,
            },
            None => RawGetResponse {
                value: Vec::new(),
                not_found: true,
            },
        })
    }

    /// Store `req.value` under `req.key` in `req.cf`
    pub fn raw_put(&self, req: RawPutRequest) -> Result<RawPutResponse> {
        self.storage.write(&[Modify::Put {
            cf: req.cf,
            key: req.key,
            value: req.value,
        }])?;
        Ok(RawPutResponse {})
    }

    /// Remove `req.key` from `req.cf`; deleting a missing key is fine
    pub fn raw_delete(&self, req: RawDeleteRequest) -> Result<RawDeleteResponse> {
        self.storage.write(&[Modify::Delete {
            cf: req.cf,
            key: req.key,
        }])?;
        Ok(RawDeleteResponse {})
    }

    /// Up to `req.limit` pairs of `req.cf` starting at `req.start_key`
    pub fn raw_scan(&self, req: RawScanRequest) -> Result<RawScanResponse> {
        let reader = self.storage.reader()?;
        let kvs = raw_scan(&reader, &req.cf, &req.start_key, req.limit as usize)?;
        reader.close();

        tracing::trace!("raw_scan cf={} returned {} pairs", req.cf, kvs.len());
        Ok(RawScanResponse { kvs })
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}
