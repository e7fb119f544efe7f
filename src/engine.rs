//! Engine Module
//!
//! The embedded ordered key-value engine under the column-family layer.
//!
//! ## Responsibilities
//! - Hand out read snapshots pinned at the latest committed seqno
//! - Point reads and ordered iteration as of a snapshot
//! - Atomic, durable batch commit (WAL first, then memtable, then publish)
//! - Crash recovery, checkpoints and version pruning
//!
//! The engine knows nothing about column families: keys arriving here are
//! already encoded.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::error::{CfkvError, Result};
use crate::memtable::{InternalKey, MemTable, MemTableEntry};
use crate::snapshot::{EngineIterator, Snapshot, SnapshotTracker};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (commit/checkpoint/close): serialized by the `wal` mutex
///   - Only ONE commit at a time
///   - Order: allocate seqno → WAL append → memtable insert → publish seqno
///
/// - **Reads** (snapshot get/iterate): lock-free on the memtable
///   - A snapshot only sees seqnos published before it was pinned, so a batch
///     that is half inserted is invisible to everyone
///
/// - **Pruning**: removes versions below the oldest pinned snapshot; safe to
///   run alongside readers and the writer
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Multi-version in-memory table (shared with snapshots)
    memtable: Arc<MemTable>,

    /// Latest published seqno and pinned snapshots (shared with snapshots)
    snapshots: Arc<SnapshotTracker>,

    /// Set once by `close()`; snapshots check it before every read
    closed: Arc<AtomicBool>,

    /// Write-ahead log; its mutex is the write lock
    wal: Mutex<WalWriter>,

    /// Where checkpoints are written
    checkpoint_path: PathBuf,

    /// Commits since the last pruning pass
    commits_since_prune: AtomicU64,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const CHECKPOINT_FILENAME: &'static str = "checkpoint.ckpt";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load the checkpoint if one exists
    /// 3. Replay WAL records newer than the checkpoint
    /// 4. Fold recovered records into a fresh checkpoint
    /// 5. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let checkpoint_path = config.data_dir.join(Self::CHECKPOINT_FILENAME);

        let memtable = Arc::new(MemTable::new());

        // Step 2: Load checkpoint
        let mut last_seqno = 0;
        if let Some(checkpoint) = Checkpoint::load(&checkpoint_path)? {
            last_seqno = checkpoint.seqno;
            let count = checkpoint.entries.len();
            for (key, value) in checkpoint.entries {
                memtable.insert(
                    InternalKey::new(key, checkpoint.seqno),
                    MemTableEntry::Value(value),
                );
            }
            tracing::info!(
                "Loaded checkpoint: {} entries at seqno {}",
                count,
                checkpoint.seqno
            );
        }

        // Step 3: Replay WAL
        let mut replayed = 0;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.was_truncated {
                tracing::warn!(
                    "WAL recovery discarded {} trailing bytes",
                    recovery.bytes_discarded
                );
            }

            for entry in entries {
                // Records at or below the checkpoint were folded in already
                // (crash between checkpoint rename and WAL truncate).
                if entry.seqno <= last_seqno {
                    continue;
                }
                memtable.apply(entry.seqno, &entry.operations);
                last_seqno = entry.seqno;
                replayed += 1;
            }

            tracing::info!(
                "WAL recovery: {} records recovered, {} replayed, last_seqno={}",
                recovery.entries_recovered,
                replayed,
                last_seqno
            );
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.set_last_seqno(last_seqno);

        let engine = Self {
            config,
            memtable,
            snapshots: Arc::new(SnapshotTracker::new(last_seqno)),
            closed: Arc::new(AtomicBool::new(false)),
            wal: Mutex::new(wal),
            checkpoint_path,
            commits_since_prune: AtomicU64::new(0),
        };

        // Step 4: Make recovered data durable in a checkpoint and start a
        // fresh log, so the next crash never replays the same records twice.
        if replayed > 0 {
            let mut wal = engine.wal.lock();
            engine.checkpoint_locked(&mut wal)?;
        }

        tracing::info!(
            "Engine opened at {} (seqno {})",
            engine.config.data_dir.display(),
            last_seqno
        );

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Open a read snapshot of everything committed so far
    ///
    /// Cheap: pins the latest seqno, no I/O.
    pub fn begin_read(&self) -> Result<Snapshot> {
        self.check_open()?;
        Ok(Snapshot::pin(
            Arc::clone(&self.memtable),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.closed),
        ))
    }

    /// Point read of an encoded key at `snapshot`
    pub fn get(&self, snapshot: &Snapshot, key: &[u8]) -> Result<Option<Bytes>> {
        snapshot.get(key)
    }

    /// Iterator over the encoded keys of `snapshot` starting with `prefix`
    pub fn new_iterator<'s>(
        &self,
        snapshot: &'s Snapshot,
        prefix: &[u8],
    ) -> Result<EngineIterator<'s>> {
        snapshot.iter(prefix)
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Commit a batch atomically
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Append one WAL record for the whole batch (durability)
    /// 3. Insert every operation into the MemTable under one seqno
    /// 4. Publish the seqno (the batch becomes visible all at once)
    /// 5. Checkpoint / prune if due
    ///
    /// An empty batch is a no-op.
    pub fn commit_batch(&self, operations: &[Operation]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        let mut wal = self.wal.lock();
        self.check_open()?;

        let seqno = wal.last_seqno() + 1;
        let wal_size = wal.append(seqno, operations)?;
        self.memtable.apply(seqno, operations);
        self.snapshots.publish(seqno);

        tracing::debug!(
            "Committed batch seqno={} ops={} wal_size={}",
            seqno,
            operations.len(),
            wal_size
        );

        // The batch is durable at this point; a failed checkpoint only means
        // the WAL keeps growing until the next attempt.
        if wal_size >= self.config.wal_size_limit {
            if let Err(e) = self.checkpoint_locked(&mut wal) {
                tracing::warn!("Checkpoint after seqno {} failed: {}", seqno, e);
            }
        } else if self.config.prune_interval > 0 {
            let commits = self.commits_since_prune.fetch_add(1, Ordering::Relaxed) + 1;
            if commits >= self.config.prune_interval {
                self.prune();
            }
        }

        Ok(())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Write a checkpoint of the latest state and truncate the WAL
    pub fn checkpoint(&self) -> Result<u64> {
        let mut wal = self.wal.lock();
        self.check_open()?;
        self.checkpoint_locked(&mut wal)
    }

    /// Internal checkpoint (called with the write lock held)
    fn checkpoint_locked(&self, wal: &mut WalWriter) -> Result<u64> {
        let seqno = wal.last_seqno();
        let entries = LiveEntries {
            memtable: &self.memtable,
            seqno,
            last: None,
        };
        let count = Checkpoint::write(&self.checkpoint_path, seqno, entries)?;

        // Entries are durable in the checkpoint; the log can go
        wal.truncate()?;

        let pruned = self.prune();
        tracing::info!(
            "Checkpoint written: {} entries at seqno {}, {} versions pruned",
            count,
            seqno,
            pruned
        );
        Ok(count)
    }

    /// Remove versions no live snapshot can read; returns how many went
    pub fn prune(&self) -> usize {
        self.commits_since_prune.store(0, Ordering::Relaxed);
        let watermark = self.snapshots.min_pinned_seqno();
        let removed = self.memtable.prune(watermark);
        if removed > 0 {
            tracing::debug!("Pruned {} versions below seqno {}", removed, watermark);
        }
        removed
    }

    /// Close the engine gracefully
    ///
    /// Syncs the WAL, checkpoints, and only then marks the handle closed.
    /// Later operations on the engine or on snapshots taken from it fail
    /// with `EngineClosed`. If syncing or checkpointing fails the engine
    /// stays open and `close` can be retried. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        // Acknowledged commits are durable before anything else is attempted
        wal.sync()?;
        self.checkpoint_locked(&mut wal)?;
        self.closed.store(true, Ordering::Release);

        tracing::info!("Engine closed at seqno {}", wal.last_seqno());
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CfkvError::EngineClosed);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Latest committed (and visible) seqno
    pub fn latest_seqno(&self) -> u64 {
        self.snapshots.latest_seqno()
    }

    /// Number of snapshots not yet released
    pub fn live_snapshots(&self) -> usize {
        self.snapshots.live_count()
    }

    /// Number of versions held in the memtable
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    /// Approximate memtable size in bytes
    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    /// Current WAL size in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.lock().size()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.wal.get_mut().sync() {
                tracing::warn!("WAL sync on drop failed: {}", e);
            }
        }
    }
}

/// Live entries of the memtable at one seqno, in key order
struct LiveEntries<'a> {
    memtable: &'a MemTable,
    seqno: u64,
    last: Option<Bytes>,
}

impl Iterator for LiveEntries<'_> {
    type Item = (Bytes, Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        let from = match &self.last {
            Some(key) => std::ops::Bound::Excluded(key.as_ref()),
            None => std::ops::Bound::Unbounded,
        };
        let (key, value) = self.memtable.seek(from, &[], self.seqno)?;
        self.last = Some(key.clone());
        Some((key, value))
    }
}
