//! # Coffer
//!
//! An embedded, single-process, file-backed key-value store:
//! - Named boxes persisted as append-only logs of CRC-checked frames
//! - Optional AES-256 encryption and lazy value loading
//! - Crash recovery on open, periodic copy-compaction
//! - O(log n) key and positional lookup via an indexable skip list
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         CoreBox                             │
//! │        (map API, transactions, change watching)             │
//! └──────────┬──────────────────────┬───────────────────────────┘
//!            │                      │
//!            ▼                      ▼
//!     ┌─────────────┐        ┌─────────────┐
//!     │  Keystore   │        │  Notifier   │
//!     │ (skip list) │        │ (broadcast) │
//!     └──────┬──────┘        └─────────────┘
//!            │
//!            ▼
//!     ┌─────────────┐        ┌─────────────┐
//!     │   Backend   │◄──────►│ Frame codec │
//!     │ (.hive log) │        │ (+ crypto)  │
//!     └─────────────┘        └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod crypto;
pub mod frame;
pub mod keystore;
pub mod backend;
pub mod boxes;
pub mod notifier;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CofferError, Result};
pub use config::{BoxOptions, CompactionStrategy};
pub use codec::{CustomValue, TypeAdapter, TypeRegistry, Value};
pub use frame::{BoxKey, Frame};
pub use boxes::{CoreBox, Transaction};
pub use notifier::ChangeEvent;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of coffer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
