//! WAL Entry definitions
//!
//! Defines the structure of individual WAL records.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CfkvError, Result};

/// Record header: Seqno (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a single record may carry (256 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 256 * 1024 * 1024;

/// A single record in the WAL: one committed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Sequence number stamped on every operation of the batch
    pub seqno: u64,

    /// Timestamp (unix millis) when the record was created
    pub timestamp: u64,

    /// The batch, in application order
    pub operations: Vec<Operation>,
}

/// Operations that can be logged (keys are already CF-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// The encoded key this operation targets
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }

    /// Approximate in-memory footprint
    pub fn size(&self) -> usize {
        match self {
            Operation::Put { key, value } => key.len() + value.len(),
            Operation::Delete { key } => key.len(),
        }
    }
}

impl WalEntry {
    /// Create a record stamped with the current time
    pub fn new(seqno: u64, operations: Vec<Operation>) -> Self {
        Self {
            seqno,
            timestamp: now_millis(),
            operations,
        }
    }

    /// Encode the full framed record: header + payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_record(self.seqno, self.timestamp, &self.operations)
    }

    /// Rebuild a record from its header fields and payload, verifying the CRC
    pub fn decode(seqno: u64, crc: u32, payload: &[u8]) -> Result<Self> {
        let actual = compute_crc(&seqno.to_le_bytes(), payload);
        if actual != crc {
            return Err(CfkvError::WalCorruption(format!(
                "CRC mismatch for seqno {}: expected {:08x}, got {:08x}",
                seqno, crc, actual
            )));
        }

        let (timestamp, operations): (u64, Vec<Operation>) = bincode::deserialize(payload)
            .map_err(|e| CfkvError::WalCorruption(format!("undecodable payload: {}", e)))?;

        Ok(Self {
            seqno,
            timestamp,
            operations,
        })
    }
}

/// Frame a batch as one record without taking ownership of it
pub(crate) fn encode_record(seqno: u64, timestamp: u64, operations: &[Operation]) -> Result<Vec<u8>> {
    let payload = bincode::serialize(&(timestamp, operations))?;
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(CfkvError::WalWrite(format!(
            "batch payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let seqno_bytes = seqno.to_le_bytes();
    let crc = compute_crc(&seqno_bytes, &payload);

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len());
    record.extend_from_slice(&seqno_bytes);
    record.extend_from_slice(&crc.to_le_bytes());
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// CRC covers the seqno and the payload so a record can't be replayed under
/// the wrong sequence number.
fn compute_crc(seqno: &[u8], payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(seqno);
    hasher.update(payload);
    hasher.finalize()
}
