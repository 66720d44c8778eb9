//! Keystore Module
//!
//! In-memory index from key to on-disk position.
//!
//! ## Responsibilities
//! - Ordered key lookup and positional lookup (insertion-order-free)
//! - Cache values for eager boxes, only (offset, length) for lazy ones
//! - Track how many dead frames the file carries, for compaction triggers
//! - Hand out auto-incrementing integer keys

mod skiplist;

pub use skiplist::{IndexableSkipList, MAX_HEIGHT};

use crate::codec::Value;
use crate::frame::{BoxKey, Frame};

/// Per-key metadata: cached value (eager boxes) and frame location
#[derive(Debug, Clone)]
pub struct BoxEntry {
    pub value: Option<Value>,
    pub offset: u64,
    pub length: u32,
}

/// Ordered in-memory index over a box file.
///
/// `deleted_entries` counts on-disk frames that no longer back a live key:
/// shadowed puts and tombstones. Compaction rewrites the file without them
/// and resets the counter.
pub struct Keystore {
    entries: IndexableSkipList<BoxKey, BoxEntry>,
    deleted_entries: usize,
    next_index: u32,
}

impl Keystore {
    pub fn new() -> Self {
        Self {
            entries: IndexableSkipList::new(),
            deleted_entries: 0,
            next_index: 0,
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of dead frames on disk
    pub fn deleted_len(&self) -> usize {
        self.deleted_entries
    }

    pub fn get(&self, key: &BoxKey) -> Option<&BoxEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &BoxKey) -> bool {
        self.entries.contains(key)
    }

    /// Entry at `index` in key order
    pub fn get_at(&self, index: usize) -> Option<(&BoxKey, &BoxEntry)> {
        self.entries.get_by_index(index)
    }

    /// Sorted snapshot of all keys
    pub fn keys(&self) -> Vec<BoxKey> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    /// In-order iteration over live entries
    pub fn iter(&self) -> impl Iterator<Item = (&BoxKey, &BoxEntry)> {
        self.entries.iter()
    }

    /// Next auto-generated integer key.
    ///
    /// One past the highest integer key observed this session; deleting keys
    /// does not reclaim ids.
    pub fn auto_increment(&mut self) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Fold one frame into the index.
    ///
    /// A live frame inserts (shadowing bumps the dead count); a tombstone
    /// removes its key and always leaves dead file space behind.
    pub fn apply_frame(&mut self, frame: &Frame) {
        if frame.is_tombstone() {
            if self.entries.remove(&frame.key).is_some() {
                // The shadowed frame and the tombstone itself
                self.deleted_entries += 2;
            } else {
                self.deleted_entries += 1;
            }
            return;
        }

        if let BoxKey::Int(key) = frame.key {
            if key >= self.next_index {
                self.next_index = key + 1;
            }
        }

        let entry = BoxEntry {
            value: frame.value.clone(),
            offset: frame.offset,
            length: frame.length,
        };
        if self.entries.insert(frame.key.clone(), entry).is_some() {
            self.deleted_entries += 1;
        }
    }

    /// Rewrite one entry's file position after compaction
    pub fn set_offset(&mut self, key: &BoxKey, offset: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.offset = offset;
        }
    }

    /// Mark the file fully compacted
    pub fn reset_deleted(&mut self) {
        self.deleted_entries = 0;
    }

    /// Drop every entry, returning the keys that were live
    pub fn clear(&mut self) -> Vec<BoxKey> {
        let keys = self.keys();
        self.entries.clear();
        self.deleted_entries = 0;
        keys
    }
}

impl Default for Keystore {
    fn default() -> Self {
        Self::new()
    }
}
