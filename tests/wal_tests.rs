//! Tests for the Write-Ahead Log
//!
//! These tests verify:
//! - Records are read back in append order with their batches intact
//! - Torn tails are detected and truncated during recovery
//! - CRC mismatches stop recovery at the damaged record
//! - Seqnos must strictly increase

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

use cfkv::config::WalSyncStrategy;
use cfkv::wal::{Operation, WalEntry, WalReader, WalRecovery, WalWriter, HEADER_SIZE};
use cfkv::CfkvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn delete(key: &str) -> Operation {
    Operation::Delete {
        key: key.as_bytes().to_vec(),
    }
}

/// Writes three records and returns the log size after each one
fn write_three(dir: &TempDir) -> (std::path::PathBuf, Vec<u64>) {
    let path = dir.path().join("wal.log");
    let mut writer = WalWriter::open(&path, WalSyncStrategy::EveryWrite).unwrap();

    let sizes = vec![
        writer.append(1, &[put("a", "1"), put("b", "1")]).unwrap(),
        writer.append(2, &[delete("a")]).unwrap(),
        writer.append(3, &[put("c", "3")]).unwrap(),
    ];
    (path, sizes)
}

// =============================================================================
// Append / Read Tests
// =============================================================================

#[test]
fn test_append_and_read_back() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    assert_eq!(std::fs::metadata(&path).unwrap().len(), sizes[2]);

    let entries: Vec<WalEntry> = WalReader::open(&path)
        .unwrap()
        .entries()
        .collect::<cfkv::Result<_>>()
        .unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].seqno, 1);
    assert_eq!(entries[0].operations, vec![put("a", "1"), put("b", "1")]);
    assert_eq!(entries[1].operations, vec![delete("a")]);
    assert_eq!(entries[2].seqno, 3);
}

#[test]
fn test_encoded_entry_matches_appended_bytes() {
    let entry = WalEntry::new(7, vec![put("k", "v")]);
    let encoded = entry.encode().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wal.log");
    std::fs::write(&path, &encoded).unwrap();

    let mut reader = WalReader::open(&path).unwrap();
    assert_eq!(reader.next_entry().unwrap(), Some(entry));
    assert_eq!(reader.position(), encoded.len() as u64);
    assert_eq!(reader.next_entry().unwrap(), None);
}

#[test]
fn test_empty_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wal.log");
    let writer = WalWriter::open(&path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.size(), 0);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert!(entries.is_empty());
    assert_eq!(result, Default::default());
}

#[test]
fn test_reopen_appends_at_end() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    let mut writer = WalWriter::open(&path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.size(), sizes[2]);
    writer.set_last_seqno(3);
    writer.append(4, &[put("d", "4")]).unwrap();

    let (entries, _) = WalRecovery::recover(&path).unwrap();
    let seqnos: Vec<u64> = entries.iter().map(|e| e.seqno).collect();
    assert_eq!(seqnos, vec![1, 2, 3, 4]);
}

#[test]
fn test_rejects_non_increasing_seqno() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wal.log");
    let mut writer = WalWriter::open(&path, WalSyncStrategy::EveryWrite).unwrap();

    writer.append(5, &[put("a", "1")]).unwrap();
    let size = writer.size();

    assert!(matches!(writer.append(5, &[put("a", "2")]), Err(CfkvError::WalWrite(_))));
    assert!(matches!(writer.append(3, &[put("a", "2")]), Err(CfkvError::WalWrite(_))));
    assert_eq!(writer.size(), size);
    assert_eq!(writer.last_seqno(), 5);
}

#[test]
fn test_truncate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wal.log");
    let mut writer = WalWriter::open(&path, WalSyncStrategy::EveryNEntries { count: 10 }).unwrap();

    writer.append(1, &[put("a", "1")]).unwrap();
    writer.truncate().unwrap();
    assert_eq!(writer.size(), 0);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

    // Seqnos keep counting after a truncate
    writer.append(2, &[put("b", "2")]).unwrap();
    let (entries, _) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].seqno, 2);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_torn_header() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0xAB; HEADER_SIZE / 2]).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(result.last_seqno, 3);
    assert!(result.was_truncated);
    assert_eq!(result.bytes_discarded, (HEADER_SIZE / 2) as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), sizes[2]);
}

#[test]
fn test_recover_torn_payload() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    // Cut the last record in half
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(sizes[1] + HEADER_SIZE as u64 + 2).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(result.last_seqno, 2);
    assert!(result.was_truncated);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), sizes[1]);
}

#[test]
fn test_recover_stops_at_crc_mismatch() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    // Flip the first payload byte of the second record
    let offset = sizes[0] + HEADER_SIZE as u64;
    let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut byte = [0u8; 1];
    file.read_exact(&mut byte).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[byte[0] ^ 0xFF]).unwrap();
    drop(file);

    let mut reader = WalReader::open(&path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(matches!(reader.next_entry(), Err(CfkvError::WalCorruption(_))));

    // Records after the damaged one are discarded as well
    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(result.last_seqno, 1);
    assert_eq!(result.bytes_discarded, sizes[2] - sizes[0]);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), sizes[0]);
}

#[test]
fn test_verify_does_not_modify() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"garbage").unwrap();
    drop(file);

    let result = WalRecovery::verify(&path).unwrap();
    assert_eq!(result.entries_recovered, 3);
    assert!(result.was_truncated);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), sizes[2] + 7);
}

#[test]
fn test_recover_oversize_length_field() {
    let dir = TempDir::new().unwrap();
    let (path, sizes) = write_three(&dir);

    let mut record = Vec::new();
    record.extend_from_slice(&4u64.to_le_bytes());
    record.extend_from_slice(&0u32.to_le_bytes());
    record.extend_from_slice(&u32::MAX.to_le_bytes());
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&record).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&path).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(result.was_truncated);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), sizes[2]);
}
