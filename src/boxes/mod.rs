//! Box Module
//!
//! The user-visible map over one box file.
//!
//! ## Responsibilities
//! - Map-like operations over string and integer keys
//! - Write-through mutation: disk first, then keystore, then watchers
//! - Eager boxes cache values; lazy boxes fetch from disk on every read
//! - Evaluate the compaction strategy after each successful mutation
//!
//! ## Data Flow
//! ```text
//! put:  Box ──► Frame ──► Backend append ──► Keystore ──► Notifier
//! get:  Keystore lookup (eager)  /  Keystore ──► Backend read (lazy)
//! open: Backend scan ──► Keystore, truncating a torn tail
//! ```

mod transaction;

pub use transaction::Transaction;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::StorageBackend;
use crate::codec::{TypeRegistry, Value};
use crate::config::BoxOptions;
use crate::crypto::BoxCipher;
use crate::error::{CofferError, Result};
use crate::frame::{BoxKey, Frame};
use crate::keystore::Keystore;
use crate::notifier::{ChangeEvent, ChangeNotifier};

/// A named, persistent key-value map backed by one append-only log file.
///
/// Open-by-name deduplication belongs to the embedding application; a
/// `CoreBox` itself is plain owned state, closed by value.
pub struct CoreBox {
    name: String,
    registry: Arc<TypeRegistry>,
    options: BoxOptions,
    backend: StorageBackend,
    keystore: RwLock<Keystore>,
    notifier: ChangeNotifier,
}

impl CoreBox {
    /// Open `<dir>/<name>.hive`, scanning it into memory.
    ///
    /// A torn tail is truncated away when `crash_recovery` is set and fails
    /// with `CorruptBox` otherwise. A box already open in another process
    /// fails with `BoxLocked`.
    pub fn open(
        dir: &Path,
        name: &str,
        registry: Arc<TypeRegistry>,
        options: BoxOptions,
    ) -> Result<Self> {
        let cipher = options.encryption_key.map(BoxCipher::new);
        let backend = StorageBackend::open(dir, name, cipher)?;

        let mut keystore = Keystore::new();
        backend.initialize(&registry, &mut keystore, options.lazy, options.crash_recovery)?;

        Ok(Self {
            name: name.to_string(),
            registry,
            options,
            backend,
            keystore: RwLock::new(keystore),
            notifier: ChangeNotifier::new(),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value for `key`, or `None` when absent
    pub fn get(&self, key: &BoxKey) -> Result<Option<Value>> {
        let keystore = self.keystore.read();
        let entry = match keystore.get(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if self.options.lazy {
            let (offset, length) = (entry.offset, entry.length);
            drop(keystore);
            Ok(Some(self.backend.read_value(&self.registry, offset, length)?))
        } else {
            Ok(entry.value.clone())
        }
    }

    /// Get the value at `index` in key order (0-based)
    pub fn get_at(&self, index: usize) -> Result<Option<Value>> {
        let keystore = self.keystore.read();
        let (_, entry) = match keystore.get_at(index) {
            Some(found) => found,
            None => return Ok(None),
        };
        if self.options.lazy {
            let (offset, length) = (entry.offset, entry.length);
            drop(keystore);
            Ok(Some(self.backend.read_value(&self.registry, offset, length)?))
        } else {
            Ok(entry.value.clone())
        }
    }

    /// Key at `index` in key order
    pub fn key_at(&self, index: usize) -> Option<BoxKey> {
        self.keystore
            .read()
            .get_at(index)
            .map(|(key, _)| key.clone())
    }

    pub fn contains_key(&self, key: &BoxKey) -> bool {
        self.keystore.read().contains(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.keystore.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keystore.read().is_empty()
    }

    /// Number of dead frames currently occupying file space
    pub fn deleted_len(&self) -> usize {
        self.keystore.read().deleted_len()
    }

    /// Sorted snapshot of all keys
    pub fn keys(&self) -> Vec<BoxKey> {
        self.keystore.read().keys()
    }

    /// All values in key order; eager boxes only
    pub fn values(&self) -> Result<Vec<Value>> {
        if self.options.lazy {
            return Err(CofferError::UnsupportedOperation(
                "values() on a lazy box; read keys individually",
            ));
        }
        let keystore = self.keystore.read();
        Ok(keystore
            .iter()
            .filter_map(|(_, entry)| entry.value.clone())
            .collect())
    }

    /// All entries in key order; eager boxes only
    pub fn to_map(&self) -> Result<Vec<(BoxKey, Value)>> {
        if self.options.lazy {
            return Err(CofferError::UnsupportedOperation(
                "to_map() on a lazy box; read keys individually",
            ));
        }
        let keystore = self.keystore.read();
        Ok(keystore
            .iter()
            .filter_map(|(key, entry)| entry.value.clone().map(|value| (key.clone(), value)))
            .collect())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Store `value` under `key`
    pub fn put(&self, key: BoxKey, value: impl Into<Value>) -> Result<()> {
        self.write_batch(vec![Frame::new(key, value.into())])
    }

    /// Store several entries with a single batched append
    pub fn put_all(&self, entries: Vec<(BoxKey, Value)>) -> Result<()> {
        let frames = entries
            .into_iter()
            .map(|(key, value)| Frame::new(key, value))
            .collect();
        self.write_batch(frames)
    }

    /// Store `value` under the next auto-generated integer key
    pub fn add(&self, value: impl Into<Value>) -> Result<u32> {
        let key = self.keystore.write().auto_increment();
        self.put(BoxKey::Int(key), value)?;
        Ok(key)
    }

    /// Delete `key`; deleting an unknown key is a no-op and writes nothing
    pub fn delete(&self, key: &BoxKey) -> Result<()> {
        if !self.contains_key(key) {
            return Ok(());
        }
        self.write_batch(vec![Frame::tombstone(key.clone())])
    }

    /// Delete several keys; tombstones are written only for known keys
    pub fn delete_all(&self, keys: &[BoxKey]) -> Result<()> {
        let frames = {
            let keystore = self.keystore.read();
            keys.iter()
                .filter(|key| keystore.contains(key))
                .map(|key| Frame::tombstone(key.clone()))
                .collect()
        };
        self.write_batch(frames)
    }

    /// Remove every key, truncating the file. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let mut keystore = self.keystore.write();
        self.backend.clear()?;
        let keys = keystore.clear();
        let removed = keys.len();
        for key in keys {
            self.notifier.notify(ChangeEvent {
                key,
                value: None,
                deleted: true,
            });
        }
        Ok(removed)
    }

    /// Rewrite the file, dropping shadowed and tombstoned frames
    pub fn compact(&self) -> Result<()> {
        let mut keystore = self.keystore.write();
        if keystore.deleted_len() == 0 {
            return Ok(());
        }
        let mut frames: Vec<Frame> = keystore
            .iter()
            .map(|(key, entry)| Frame::lazy(key.clone(), entry.offset, entry.length))
            .collect();
        self.backend.compact(&mut frames)?;
        for frame in &frames {
            keystore.set_offset(&frame.key, frame.offset);
        }
        keystore.reset_deleted();
        Ok(())
    }

    /// Start a transaction; mutations buffer until `commit`
    pub fn transaction(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    // =========================================================================
    // Watching and lifecycle
    // =========================================================================

    /// Stream of change events, optionally filtered to one key
    pub fn watch(
        &self,
        key: Option<BoxKey>,
    ) -> Result<crossbeam::channel::Receiver<ChangeEvent>> {
        self.notifier.watch(key)
    }

    /// Force appended frames to physical disk
    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        self.backend.path()
    }

    pub fn is_lazy(&self) -> bool {
        self.options.lazy
    }

    /// Close the box; watcher streams terminate
    pub fn close(self) -> Result<()> {
        self.notifier.close();
        self.backend.close()
    }

    /// Close the box and remove its files from disk
    pub fn delete_from_disk(self) -> Result<()> {
        self.notifier.close();
        self.backend.delete_from_disk()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Append a batch of frames, fold them into the keystore, notify
    /// watchers, then consult the compaction strategy.
    ///
    /// Write-through: if the append fails, the keystore is untouched and no
    /// event is emitted.
    pub(crate) fn write_batch(&self, mut frames: Vec<Frame>) -> Result<()> {
        if frames.is_empty() {
            return Ok(());
        }

        let mut keystore = self.keystore.write();
        self.backend.write_frames(&self.registry, &mut frames)?;

        for frame in &mut frames {
            let event = ChangeEvent {
                key: frame.key.clone(),
                value: frame.value.clone(),
                deleted: frame.is_tombstone(),
            };
            if self.options.lazy {
                // Lazy boxes never cache values in memory
                frame.value = None;
            }
            keystore.apply_frame(frame);
            self.notifier.notify(event);
        }

        let entries = keystore.len();
        let deleted = keystore.deleted_len();
        drop(keystore);

        if self.options.compaction.should_compact(entries, deleted) {
            self.compact()?;
        }
        Ok(())
    }
}
