//! Frame Module
//!
//! A frame is one self-contained record in a box file.
//!
//! ## Responsibilities
//! - Key validation (u32 or short ASCII string)
//! - Frame encode/decode with CRC32 verification
//! - Tombstone frames encoding deletion
//!
//! ## File Format
//! ```text
//! ┌─────────┬───────────────────┬──────────────────────┬─────────┐
//! │ Len (4) │ Key block         │ Value block or empty │ CRC (4) │
//! │ u32 LE  │                   │ (empty = tombstone)  │ u32 LE  │
//! └─────────┴───────────────────┴──────────────────────┴─────────┘
//!
//! Key block:  0x00 + u32 LE                      integer key
//!             0x01 + u8 len + ASCII bytes        string key (1..=255)
//! ```
//! The CRC covers bytes `[0, len - 4)` and is seeded with the CRC32 of the
//! encryption key, or 0 for unencrypted boxes.

pub mod codec;
pub mod crc;

pub use codec::{decode_frame, encode_frame};

use crate::codec::Value;
use crate::error::{CofferError, Result};

/// A box key: a u32 or a short ASCII string.
///
/// The derived ordering is the keystore ordering: integer keys numerically,
/// string keys by codepoint, and all integer keys before all string keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BoxKey {
    Int(u32),
    Str(String),
}

impl BoxKey {
    /// Validate and wrap a string key (ASCII, 1..=255 bytes)
    pub fn string(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() || key.len() > 255 {
            return Err(CofferError::InvalidKey(format!(
                "string key must be 1..=255 bytes, got {}",
                key.len()
            )));
        }
        if !key.is_ascii() {
            return Err(CofferError::InvalidKey(format!(
                "string key must be ASCII: {:?}",
                key
            )));
        }
        Ok(BoxKey::Str(key))
    }
}

impl From<u32> for BoxKey {
    fn from(key: u32) -> Self {
        BoxKey::Int(key)
    }
}

impl TryFrom<&str> for BoxKey {
    type Error = CofferError;

    fn try_from(key: &str) -> Result<Self> {
        BoxKey::string(key)
    }
}

impl std::fmt::Display for BoxKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoxKey::Int(key) => write!(f, "{}", key),
            BoxKey::Str(key) => write!(f, "{}", key),
        }
    }
}

/// One record in a box file.
///
/// `offset` and `length` describe where the frame sits on disk; they are
/// filled in by the backend when the frame is written or scanned.
#[derive(Debug, Clone)]
pub struct Frame {
    pub key: BoxKey,
    pub value: Option<Value>,
    pub deleted: bool,
    pub offset: u64,
    pub length: u32,
}

impl Frame {
    /// A live frame carrying a value
    pub fn new(key: BoxKey, value: Value) -> Self {
        Self {
            key,
            value: Some(value),
            deleted: false,
            offset: 0,
            length: 0,
        }
    }

    /// A tombstone encoding deletion of `key`
    pub fn tombstone(key: BoxKey) -> Self {
        Self {
            key,
            value: None,
            deleted: true,
            offset: 0,
            length: 0,
        }
    }

    /// A live frame whose value stays on disk (lazy scan)
    pub fn lazy(key: BoxKey, offset: u64, length: u32) -> Self {
        Self {
            key,
            value: None,
            deleted: false,
            offset,
            length,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }
}
