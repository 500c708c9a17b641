//! Cache storage layer.
//!
//! Collections persist as JSON arrays of records under string keys in a
//! small key/value store. The store is synchronous: reads and writes are
//! whole-collection, which keeps merges simple and atomic from the
//! engine's point of view.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::Record;

/// Trait for the durable key/value storage backing the offline cache
pub trait CacheStore {
    /// Read the raw value under a key.
    fn get(&self, key: &str) -> Option<String>;

    /// Write the raw value under a key.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Typed access to one collection key in a cache store.
///
/// A corrupt payload reads as an empty collection instead of failing the
/// operation; the next successful persist rewrites it.
#[derive(Debug, Clone)]
pub struct CollectionSlot {
    key: String,
}

impl CollectionSlot {
    /// Create a slot for the given cache key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The underlying cache key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the collection, tolerating missing or corrupt payloads.
    #[must_use]
    pub fn load(&self, store: &dyn CacheStore) -> Vec<Record> {
        let Some(raw) = store.get(&self.key) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|error| {
            tracing::warn!("Corrupt cache under key {}, starting empty: {}", self.key, error);
            Vec::new()
        })
    }

    /// Persist the whole collection.
    pub fn save(&self, store: &mut dyn CacheStore, records: &[Record]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        store.set(&self.key, &raw)
    }
}
