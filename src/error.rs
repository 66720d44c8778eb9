//! Error types for coffer
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CofferError
pub type Result<T> = std::result::Result<T, CofferError>;

/// Unified error type for coffer operations
#[derive(Debug, Error)]
pub enum CofferError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Frame / Codec Errors
    // -------------------------------------------------------------------------
    #[error("corrupt frame: {0}")]
    CorruptFrame(String),

    #[error("box corrupted at offset {0} and crash recovery is disabled")]
    CorruptBox(u64),

    #[error("no adapter registered for type id {0}")]
    UnknownType(u8),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("type id {0} is already registered")]
    AlreadyRegistered(u8),

    #[error("type id {0} is outside the adapter range 0..=223")]
    InvalidTypeId(u8),

    // -------------------------------------------------------------------------
    // Box Errors
    // -------------------------------------------------------------------------
    #[error("box '{0}' is locked by another process")]
    BoxLocked(String),

    #[error("box is closed")]
    BoxClosed,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}
