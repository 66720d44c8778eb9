//! Transactions
//!
//! A transaction buffers mutations against a shadow view of the box and
//! commits them as one batched append. Nothing touches disk, keystore or
//! watchers until `commit`; dropping the transaction discards it.

use std::collections::HashMap;

use crate::codec::Value;
use crate::error::Result;
use crate::frame::{BoxKey, Frame};

use super::CoreBox;

/// Buffered mutations against one box
pub struct Transaction<'a> {
    parent: &'a CoreBox,
    frames: Vec<Frame>,
    /// Local view of touched keys; `None` marks a pending delete
    shadow: HashMap<BoxKey, Option<Value>>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(parent: &'a CoreBox) -> Self {
        Self {
            parent,
            frames: Vec::new(),
            shadow: HashMap::new(),
        }
    }

    /// Buffer a put
    pub fn put(&mut self, key: BoxKey, value: impl Into<Value>) {
        let value = value.into();
        self.frames.push(Frame::new(key.clone(), value.clone()));
        self.shadow.insert(key, Some(value));
    }

    /// Buffer a delete; unknown keys stay a no-op
    pub fn delete(&mut self, key: &BoxKey) {
        let exists = match self.shadow.get(key) {
            Some(pending) => pending.is_some(),
            None => self.parent.contains_key(key),
        };
        if !exists {
            return;
        }
        self.frames.push(Frame::tombstone(key.clone()));
        self.shadow.insert(key.clone(), None);
    }

    /// Read through the transaction: buffered mutations shadow the box
    pub fn get(&self, key: &BoxKey) -> Result<Option<Value>> {
        match self.shadow.get(key) {
            Some(Some(value)) => Ok(Some(value.clone())),
            Some(None) => Ok(None),
            None => self.parent.get(key),
        }
    }

    /// Number of buffered mutations
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Apply every buffered mutation with a single append.
    ///
    /// All-or-nothing: a failed append leaves the box exactly as it was and
    /// watchers see no events.
    pub fn commit(self) -> Result<()> {
        self.parent.write_batch(self.frames)
    }
}
