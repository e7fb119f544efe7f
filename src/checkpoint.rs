//! Checkpoint file
//!
//! A checkpoint is the complete live state of the store as of one seqno.
//! Once it is on disk the WAL can be truncated.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (22 bytes)                                       │
//! │   Magic: "CFKV" (4) | Version: u16 (2) | Seqno: u64 (8) │
//! │   Count: u64 (8)                                        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable, sorted by encoded key)            │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   CRC32 of header + data: u32                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Tombstones are never written: a checkpoint only holds live keys.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use bytes::Bytes;

use crate::error::{CfkvError, Result};

/// Magic bytes identifying a cfkv checkpoint file
const MAGIC: &[u8; 4] = b"CFKV";

/// Current checkpoint format version
const VERSION: u16 = 1;

/// Magic (4) + Version (2) + Seqno (8) + Count (8)
const HEADER_SIZE: usize = 22;

/// CRC32 footer
const FOOTER_SIZE: usize = 4;

/// A checkpoint loaded from disk
#[derive(Debug, Default)]
pub struct Checkpoint {
    /// Seqno of the last batch folded into this checkpoint
    pub seqno: u64,

    /// Live entries in ascending encoded-key order
    pub entries: Vec<(Bytes, Bytes)>,
}

impl Checkpoint {
    /// Write a checkpoint atomically
    ///
    /// Data goes to a temporary file that is fsynced and renamed over `path`,
    /// so a crash leaves either the old checkpoint or the new one.
    pub fn write<I>(path: &Path, seqno: u64, entries: I) -> Result<u64>
    where
        I: IntoIterator<Item = (Bytes, Bytes)>,
    {
        let tmp_path = path.with_extension("ckpt.tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let mut hasher = crc32fast::Hasher::new();

        // Count isn't known up front; entries are buffered per record and the
        // header is written after.
        let mut data = Vec::new();
        let mut count: u64 = 0;
        for (key, value) in entries {
            let key_len = u32::try_from(key.len())
                .map_err(|_| CfkvError::Storage(format!("key of {} bytes too large", key.len())))?;
            let val_len = u32::try_from(value.len()).map_err(|_| {
                CfkvError::Storage(format!("value of {} bytes too large", value.len()))
            })?;
            data.extend_from_slice(&key_len.to_le_bytes());
            data.extend_from_slice(&val_len.to_le_bytes());
            data.extend_from_slice(&key);
            data.extend_from_slice(&value);
            count += 1;
        }

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&seqno.to_le_bytes());
        header.extend_from_slice(&count.to_le_bytes());

        hasher.update(&header);
        hasher.update(&data);

        writer.write_all(&header)?;
        writer.write_all(&data)?;
        writer.write_all(&hasher.finalize().to_le_bytes())?;
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| CfkvError::Storage(format!("Failed to flush checkpoint: {}", e)))?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, path)?;
        if let Some(dir) = path.parent() {
            // Persist the rename; not every platform allows opening a directory.
            if let Ok(handle) = File::open(dir) {
                if let Err(e) = handle.sync_all() {
                    tracing::warn!(
                        "fsync of checkpoint directory {} failed: {}",
                        dir.display(),
                        e
                    );
                }
            }
        }

        Ok(count)
    }

    /// Load a checkpoint, or `None` if there is no file at `path`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(CfkvError::Corruption(format!(
                "checkpoint {} is truncated ({} bytes)",
                path.display(),
                bytes.len()
            )));
        }

        let (body, footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);
        let expected = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(CfkvError::Corruption(format!(
                "checkpoint CRC mismatch: expected {:08x}, got {:08x}",
                expected, actual
            )));
        }

        if &body[0..4] != MAGIC {
            return Err(CfkvError::Corruption(format!(
                "Invalid checkpoint magic: expected CFKV, got {:?}",
                &body[0..4]
            )));
        }
        let version = u16::from_le_bytes([body[4], body[5]]);
        if version != VERSION {
            return Err(CfkvError::Corruption(format!(
                "Unsupported checkpoint version: {}",
                version
            )));
        }

        let mut cursor = Cursor::new(&body[6..]);
        let seqno = cursor.u64()?;
        let count = cursor.u64()?;

        let mut entries = Vec::with_capacity(count.min(1 << 20) as usize);
        for _ in 0..count {
            let key_len = cursor.u32()? as usize;
            let val_len = cursor.u32()? as usize;
            let key = Bytes::copy_from_slice(cursor.take(key_len)?);
            let value = Bytes::copy_from_slice(cursor.take(val_len)?);
            entries.push((key, value));
        }

        if !cursor.is_empty() {
            return Err(CfkvError::Corruption(
                "trailing bytes after checkpoint entries".to_string(),
            ));
        }

        Ok(Some(Self { seqno, entries }))
    }
}

/// Bounds-checked little-endian reader over a byte slice
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() < n {
            return Err(CfkvError::Corruption(format!(
                "checkpoint entry truncated: need {} bytes, have {}",
                n,
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
