//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{CfkvError, Result};

use super::entry::{encode_record, now_millis};
use super::Operation;

/// Writes records to the WAL file
///
/// Not thread-safe on its own; the engine keeps it behind its write mutex.
pub struct WalWriter {
    /// Path of the log (for diagnostics)
    path: PathBuf,

    /// Handle positioned at the end of the log
    file: File,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Records appended since the last fsync
    unsynced: usize,

    /// Current log size in bytes (end of the last complete record)
    size: u64,

    /// Seqno of the last appended record (0 if none)
    last_seqno: u64,

    /// Set when a failed append could not be rolled back; the log may end in
    /// a partial record, so nothing more may be appended until `truncate`
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file, positioned for appending
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let size = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            unsynced: 0,
            size,
            last_seqno: 0,
            poisoned: false,
        })
    }

    /// Append one batch as a single record
    ///
    /// The record is handed to the OS before returning and fsynced according
    /// to the sync strategy. On failure the log is cut back to its previous
    /// length so a half-written record never sits in front of later ones.
    /// Returns the new log size.
    pub fn append(&mut self, seqno: u64, operations: &[Operation]) -> Result<u64> {
        if self.poisoned {
            return Err(CfkvError::WalWrite(format!(
                "{} ends in a partial record after a failed rollback",
                self.path.display()
            )));
        }
        if seqno <= self.last_seqno {
            return Err(CfkvError::WalWrite(format!(
                "seqno {} is not after last appended seqno {}",
                seqno, self.last_seqno
            )));
        }

        let record = encode_record(seqno, now_millis(), operations)?;

        if let Err(e) = self.write_record(&record) {
            self.rollback();
            return Err(CfkvError::WalWrite(format!(
                "append of seqno {} to {} failed: {}",
                seqno,
                self.path.display(),
                e
            )));
        }

        self.size += record.len() as u64;
        self.last_seqno = seqno;
        Ok(self.size)
    }

    fn write_record(&mut self, record: &[u8]) -> Result<()> {
        self.file.write_all(record)?;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        let size = self.size;
        if let Err(e) = self
            .file
            .set_len(size)
            .and_then(|_| self.file.seek(SeekFrom::Start(size)).map(|_| ()))
        {
            tracing::error!(
                "WAL rollback to {} bytes failed, refusing further appends: {}",
                size,
                e
            );
            self.poisoned = true;
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every record (their contents are durable elsewhere)
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        self.size = 0;
        self.unsynced = 0;
        self.poisoned = false;
        Ok(())
    }

    /// Tell the writer which seqno recovery ended at
    pub fn set_last_seqno(&mut self, seqno: u64) {
        self.last_seqno = seqno;
    }

    /// Seqno of the last appended record
    pub fn last_seqno(&self) -> u64 {
        self.last_seqno
    }

    /// Current log size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once a failed rollback has left the log unusable
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
