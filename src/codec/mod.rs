//! Codec Module
//!
//! The typed binary codec shared by every frame on disk.
//!
//! ## Responsibilities
//! - Self-describing value tagging (one tag byte per value)
//! - Primitive and collection encode/decode, little-endian throughout
//! - User-type dispatch through the adapter registry
//!
//! ## Wire Format
//! ```text
//! ┌─────────┬──────────────────────────────┐
//! │ Tag (1) │ Payload (tag-dependent)      │
//! └─────────┴──────────────────────────────┘
//! ```
//! Strings and collections carry a u16 LE length prefix inside the payload.
//! Tags 0..=11 are the built-in shapes, 12..=31 are reserved, and 32..=255
//! dispatch to registered adapters.

mod reader;
mod registry;
mod value;
mod writer;

pub use reader::BinaryReader;
pub use registry::{TypeAdapter, TypeRegistry};
pub use value::{tag, CustomValue, Value};
pub use writer::BinaryWriter;
