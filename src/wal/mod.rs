//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for committed write batches.
//!
//! ## Responsibilities
//! - Append one record per committed batch before it becomes visible
//! - CRC32 checksums for corruption detection
//! - Sequence numbers for ordering and checkpoint cut-off
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Record 1                                     │
//! │ ┌───────────┬─────────┬─────────┬──────────┐ │
//! │ │ Seqno (8) │ CRC (4) │ Len (4) │ Payload  │ │
//! │ └───────────┴─────────┴─────────┴──────────┘ │
//! ├──────────────────────────────────────────────┤
//! │ Record 2                                     │
//! │ ┌───────────┬─────────┬─────────┬──────────┐ │
//! │ │ Seqno (8) │ CRC (4) │ Len (4) │ Payload  │ │
//! │ └───────────┴─────────┴─────────┴──────────┘ │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The payload is the bincode encoding of the batch's operations. A batch is
//! a single record, so replay applies it completely or not at all.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE, MAX_PAYLOAD_SIZE};
pub use writer::WalWriter;
pub use reader::WalReader;
pub use recovery::{WalRecovery, RecoveryResult};
