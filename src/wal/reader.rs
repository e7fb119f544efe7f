//! WAL Reader
//!
//! Handles reading records from the WAL file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{CfkvError, Result};

use super::{WalEntry, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Reads records from the WAL file, front to back
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset just past the last record returned successfully
    position: u64,

    /// File length at open
    file_len: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
        })
    }

    /// Read the next record from the WAL
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: a complete, checksummed record
    /// - `Ok(None)`: clean end of log
    /// - `Err(WalCorruption)`: torn or corrupt record at `position()`
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let remaining = self.file_len - self.position;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < HEADER_SIZE as u64 {
            return Err(CfkvError::WalCorruption(format!(
                "torn record header at offset {} ({} trailing bytes)",
                self.position, remaining
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;

        let seqno = u64::from_le_bytes([
            header[0], header[1], header[2], header[3], header[4], header[5], header[6], header[7],
        ]);
        let crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        let len = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);

        if len > MAX_PAYLOAD_SIZE {
            return Err(CfkvError::WalCorruption(format!(
                "record at offset {} claims {} payload bytes",
                self.position, len
            )));
        }
        if remaining - (HEADER_SIZE as u64) < len as u64 {
            return Err(CfkvError::WalCorruption(format!(
                "torn record payload at offset {}",
                self.position
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload)?;

        let entry = WalEntry::decode(seqno, crc, &payload)?;
        self.position += HEADER_SIZE as u64 + len as u64;
        Ok(Some(entry))
    }

    /// Iterate over all records up to the first error
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last good record
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Iterator over WAL records
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
