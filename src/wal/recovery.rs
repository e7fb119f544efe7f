//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{CfkvError, Result};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Bytes after the last good record (torn or corrupt tail)
    pub bytes_discarded: u64,

    /// Last valid seqno (0 if the log was empty)
    pub last_seqno: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover records from a WAL file
    ///
    /// This will:
    /// 1. Read records until the end of the log or the first bad record
    /// 2. Truncate the file after the last good record
    /// 3. Return all good records in order
    ///
    /// Everything after the first bad record is discarded: a torn write can
    /// only be at the tail, and records past a corrupt one can't be trusted
    /// to be in order.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            let valid_len = file.metadata()?.len() - result.bytes_discarded;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path).map(|(_, result)| result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut good_len = 0;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.seqno <= result.last_seqno {
                        tracing::warn!(
                            "WAL record seqno {} does not follow {}, discarding tail",
                            entry.seqno,
                            result.last_seqno
                        );
                        break;
                    }
                    result.entries_recovered += 1;
                    result.last_seqno = entry.seqno;
                    entries.push(entry);
                    good_len = reader.position();
                }
                Ok(None) => break,
                Err(CfkvError::WalCorruption(reason)) => {
                    tracing::warn!("WAL tail discarded: {}", reason);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        result.bytes_discarded = file_len - good_len;
        result.was_truncated = result.bytes_discarded > 0;

        Ok((entries, result))
    }
}
