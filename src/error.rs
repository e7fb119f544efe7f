//! Error types for cfkv
//!
//! Provides a unified error type for all operations.
//!
//! A point lookup that finds nothing is not an error: it is `Ok(None)`.

use thiserror::Error;

/// Result type alias using CfkvError
pub type Result<T> = std::result::Result<T, CfkvError>;

/// Unified error type for cfkv operations
#[derive(Debug, Error)]
pub enum CfkvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Engine is closed")]
    EngineClosed,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown column family: {0:?}")]
    UnknownColumnFamily(String),

    // -------------------------------------------------------------------------
    // Misuse Errors
    // -------------------------------------------------------------------------
    #[error("Iterator used before seek")]
    IteratorNotSeeked,
}

impl CfkvError {
    /// True for errors caused by the caller rather than by the store
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            CfkvError::UnknownColumnFamily(_) | CfkvError::IteratorNotSeeked
        )
    }

    /// True for failures of the underlying engine (disk, corruption, closed handle)
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            CfkvError::Io(_)
                | CfkvError::WalCorruption(_)
                | CfkvError::WalWrite(_)
                | CfkvError::Storage(_)
                | CfkvError::Corruption(_)
                | CfkvError::EngineClosed
        )
    }
}

impl From<bincode::Error> for CfkvError {
    fn from(e: bincode::Error) -> Self {
        CfkvError::Serialization(e.to_string())
    }
}
