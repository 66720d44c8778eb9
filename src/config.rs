//! Box configuration
//!
//! Per-box options with sensible defaults.

use std::fmt;
use std::sync::Arc;

/// Options controlling how a box is opened and maintained
#[derive(Clone)]
pub struct BoxOptions {
    /// Keep only (offset, length) in memory; every `get` reads from disk
    pub lazy: bool,

    /// Truncate a torn tail on open instead of failing
    pub crash_recovery: bool,

    /// AES-256 key; when set, frame values are stored encrypted
    pub encryption_key: Option<[u8; 32]>,

    /// Decides after each mutation whether the log should be rewritten
    pub compaction: CompactionStrategy,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            lazy: false,
            crash_recovery: true,
            encryption_key: None,
            compaction: CompactionStrategy::default(),
        }
    }
}

impl fmt::Debug for BoxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxOptions")
            .field("lazy", &self.lazy)
            .field("crash_recovery", &self.crash_recovery)
            .field("encrypted", &self.encryption_key.is_some())
            .finish()
    }
}

impl BoxOptions {
    /// Create a new options builder
    pub fn builder() -> BoxOptionsBuilder {
        BoxOptionsBuilder::default()
    }
}

/// Builder for BoxOptions
#[derive(Default)]
pub struct BoxOptionsBuilder {
    options: BoxOptions,
}

impl BoxOptionsBuilder {
    /// Open the box lazily (values stay on disk until read)
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.options.lazy = lazy;
        self
    }

    /// Truncate a torn tail on open instead of failing
    pub fn crash_recovery(mut self, recover: bool) -> Self {
        self.options.crash_recovery = recover;
        self
    }

    /// Encrypt frame values with the given AES-256 key
    pub fn encryption_key(mut self, key: [u8; 32]) -> Self {
        self.options.encryption_key = Some(key);
        self
    }

    /// Replace the compaction strategy
    pub fn compaction(mut self, strategy: CompactionStrategy) -> Self {
        self.options.compaction = strategy;
        self
    }

    pub fn build(self) -> BoxOptions {
        self.options
    }
}

/// Decides whether a box should compact after a mutation.
///
/// Called with `(entries, deleted_entries)`: the number of live keys and the
/// number of dead frames currently occupying file space.
#[derive(Clone)]
pub struct CompactionStrategy(Arc<dyn Fn(usize, usize) -> bool + Send + Sync>);

impl CompactionStrategy {
    /// Wrap a custom predicate
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Never compact automatically
    pub fn never() -> Self {
        Self::new(|_, _| false)
    }

    /// Evaluate the strategy
    pub fn should_compact(&self, entries: usize, deleted: usize) -> bool {
        (self.0)(entries, deleted)
    }
}

impl Default for CompactionStrategy {
    /// Compact once dead frames pass 60 and make up at least 15% of the file
    fn default() -> Self {
        Self::new(|entries, deleted| deleted > 60 && deleted * 100 >= (entries + deleted) * 15)
    }
}

impl fmt::Debug for CompactionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompactionStrategy")
    }
}
