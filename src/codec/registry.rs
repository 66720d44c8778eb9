//! Type registry
//!
//! Maps external type ids to user adapters. Registries chain: a lookup that
//! misses falls through to the parent, which lets a box-local registry layer
//! over a shared one.

use std::sync::Arc;

use parking_lot::RwLock;

use super::reader::BinaryReader;
use super::value::{tag, Value};
use super::writer::BinaryWriter;
use crate::error::{CofferError, Result};

/// Serializer/deserializer for a user-defined value shape.
///
/// Adapters own their payload format completely: `read` consumes whatever
/// `write` produced, through the typed reader/writer. `accepts` is how the
/// registry resolves an adapter for an outgoing value.
pub trait TypeAdapter: Send + Sync {
    /// Decode one value; called with the cursor just past the tag byte
    fn read(&self, reader: &mut BinaryReader<'_>) -> Result<Value>;

    /// Encode one value; the tag byte has already been written
    fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> Result<()>;

    /// Whether this adapter handles the given value
    fn accepts(&self, value: &Value) -> bool;
}

/// Registry of adapters keyed by external type id (`0..=223`)
#[derive(Default)]
pub struct TypeRegistry {
    parent: Option<Arc<TypeRegistry>>,
    adapters: RwLock<Vec<(u8, Arc<dyn TypeAdapter>)>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that falls through to `parent` on lookup misses
    pub fn with_parent(parent: Arc<TypeRegistry>) -> Self {
        Self {
            parent: Some(parent),
            adapters: RwLock::new(Vec::new()),
        }
    }

    /// Register an adapter under an external type id.
    ///
    /// Ids occupy `0..=223`; on disk they are offset past the built-in tags.
    /// Registering an id twice fails with `AlreadyRegistered`, including when
    /// the parent already claims it.
    pub fn register(&self, adapter: Arc<dyn TypeAdapter>, type_id: u8) -> Result<()> {
        if type_id > tag::MAX_EXTERNAL_TYPE_ID {
            return Err(CofferError::InvalidTypeId(type_id));
        }
        if self.find_by_id(type_id).is_some() {
            return Err(CofferError::AlreadyRegistered(type_id));
        }
        self.adapters.write().push((type_id, adapter));
        Ok(())
    }

    /// Look up an adapter by external type id, falling through to the parent
    pub fn find_by_id(&self, type_id: u8) -> Option<Arc<dyn TypeAdapter>> {
        let found = self
            .adapters
            .read()
            .iter()
            .find(|(id, _)| *id == type_id)
            .map(|(_, adapter)| Arc::clone(adapter));
        found.or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.find_by_id(type_id))
        })
    }

    /// Resolve the adapter for an outgoing value.
    ///
    /// Linear scan in registration order, first `accepts` wins; misses fall
    /// through to the parent.
    pub fn find_by_value(&self, value: &Value) -> Option<(u8, Arc<dyn TypeAdapter>)> {
        let found = self
            .adapters
            .read()
            .iter()
            .find(|(_, adapter)| adapter.accepts(value))
            .map(|(id, adapter)| (*id, Arc::clone(adapter)));
        found.or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.find_by_value(value))
        })
    }

    /// Number of adapters registered here (excluding the parent chain)
    pub fn len(&self) -> usize {
        self.adapters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.read().is_empty()
    }
}
