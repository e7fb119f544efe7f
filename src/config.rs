//! Configuration for cfkv
//!
//! Centralized configuration with sensible defaults.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::codec::MAX_CF_NAME_LEN;
use crate::error::{CfkvError, Result};

/// Column families registered when none are configured explicitly
pub const DEFAULT_COLUMN_FAMILIES: [&str; 3] = ["default", "lock", "write"];

/// Main configuration for a cfkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log           (write-ahead log)
    ///     └── checkpoint.ckpt   (latest checkpoint, optional)
    pub data_dir: PathBuf,

    /// Column families known to this store. Fixed for the lifetime of the
    /// engine; encoding a name outside this set is an error.
    pub column_families: Vec<String>,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size (in bytes) past which a commit triggers a checkpoint
    pub wal_size_limit: u64,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Commits between version pruning passes (0 disables automatic pruning)
    pub prune_interval: u64,

    // -------------------------------------------------------------------------
    // Write Path Configuration
    // -------------------------------------------------------------------------
    /// Max number of idle write batches kept for reuse
    pub batch_pool_capacity: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./cfkv_data"),
            column_families: DEFAULT_COLUMN_FAMILIES
                .iter()
                .map(|cf| cf.to_string())
                .collect(),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            wal_size_limit: 64 * 1024 * 1024, // 64 MB
            prune_interval: 1024,
            batch_pool_capacity: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the column family list: non-empty, no duplicates, and every
    /// name between 1 and 255 bytes.
    pub fn validate(&self) -> Result<()> {
        if self.column_families.is_empty() {
            return Err(CfkvError::Config(
                "at least one column family is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for cf in &self.column_families {
            if cf.is_empty() || cf.len() > MAX_CF_NAME_LEN {
                return Err(CfkvError::Config(format!(
                    "column family name must be 1..={} bytes, got {} ({:?})",
                    MAX_CF_NAME_LEN,
                    cf.len(),
                    cf
                )));
            }
            if !seen.insert(cf.as_str()) {
                return Err(CfkvError::Config(format!(
                    "duplicate column family: {:?}",
                    cf
                )));
            }
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(CfkvError::Config(
                "EveryNEntries sync strategy needs a count of at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Replace the registered column families
    pub fn column_families<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.column_families = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size (in bytes) that triggers a checkpoint
    pub fn wal_size_limit(mut self, size: u64) -> Self {
        self.config.wal_size_limit = size;
        self
    }

    /// Set the number of commits between pruning passes
    pub fn prune_interval(mut self, commits: u64) -> Self {
        self.config.prune_interval = commits;
        self
    }

    /// Set the write batch pool capacity
    pub fn batch_pool_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_pool_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
