//! # cfkv
//!
//! A single-node, column-family key-value store with:
//! - Named column families sharing one ordered keyspace
//! - Snapshot-isolated readers and iterators
//! - Atomic multi-key write batches, pooled for reuse
//! - Write-Ahead Logging (WAL), checkpoints and crash recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Raw API (server::Server)                   │
//! │             get / put / delete / scan per CF                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              Storage (StandaloneStorage)                    │
//! │   readers · CF iterators · write batches · key codec        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ encoded keys
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Engine                              │
//! │        snapshots · atomic commit · checkpoint · prune       │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │  WAL + checkpt  │                │    MemTable     │
//!   │    (durable)    │                │  (multi-version)│
//!   └─────────────────┘                └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod wal;
pub mod memtable;
pub mod checkpoint;
pub mod snapshot;
pub mod engine;
pub mod storage;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CfkvError, Result};
pub use config::Config;
pub use codec::KeyCodec;
pub use engine::Engine;
pub use storage::{Modify, StandaloneStorage, Storage, StorageReader};
pub use server::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cfkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
