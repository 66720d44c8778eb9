//! Change notification
//!
//! Broadcast of `(key, value, deleted)` events to any number of watchers.
//! Every subscriber gets its own unbounded channel, so a slow consumer
//! buffers instead of blocking writers; a dropped receiver is pruned on the
//! next send. Events reach a subscriber in mutation order.

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::codec::Value;
use crate::error::{CofferError, Result};
use crate::frame::BoxKey;

/// One mutation as seen by watchers
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub key: BoxKey,
    /// The new value; `None` for deletions (and lazy-box tombstones)
    pub value: Option<Value>,
    pub deleted: bool,
}

struct Subscriber {
    filter: Option<BoxKey>,
    sender: Sender<ChangeEvent>,
}

struct NotifierState {
    subscribers: Vec<Subscriber>,
    closed: bool,
}

/// Broadcast hub for one box's change events
pub struct ChangeNotifier {
    state: Mutex<NotifierState>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NotifierState {
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Subscribe to change events, optionally filtered to a single key
    pub fn watch(&self, filter: Option<BoxKey>) -> Result<Receiver<ChangeEvent>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CofferError::BoxClosed);
        }
        let (sender, receiver) = unbounded();
        state.subscribers.push(Subscriber { filter, sender });
        Ok(receiver)
    }

    /// Broadcast one event; dead subscribers are dropped, never propagated
    pub fn notify(&self, event: ChangeEvent) {
        let mut state = self.state.lock();
        state.subscribers.retain(|subscriber| {
            match &subscriber.filter {
                Some(key) if *key != event.key => true,
                _ => subscriber.sender.send(event.clone()).is_ok(),
            }
        });
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Terminate all streams; later `watch` calls fail with `BoxClosed`
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
