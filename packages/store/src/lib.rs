#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable storage for the incident collection and the identity counter.
//!
//! Storage is a plain string key-value interface ([`KeyValueStore`]) with
//! two keys: the JSON-serialized incident array and the JSON-serialized
//! counter. [`PersistentStore`] reads both exactly once at startup and
//! overwrites them wholesale after every mutation. [`IdentityAllocator`]
//! hands out incident ids and writes the counter through on every call.

pub mod allocator;
pub mod file;
pub mod persistent;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

pub use allocator::IdentityAllocator;
pub use file::FileStore;
pub use persistent::{PersistentStore, Snapshot, SnapshotSource};

/// Storage key holding the incident collection.
pub const INCIDENTS_KEY: &str = "incidents";

/// Storage key holding the identity counter.
pub const COUNTER_KEY: &str = "incidentCounter";

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be parsed.
    #[error("Corrupt value under key '{key}': {source}")]
    Corrupt {
        /// The key whose value failed to parse.
        key: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A value could not be serialized for writing.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// [`PersistentStore::load`] was called a second time.
    #[error("Persisted state has already been loaded")]
    AlreadyLoaded,
}

/// String key-value storage, the equivalent of browser local storage.
///
/// Implementations use interior mutability so a single backend can be
/// shared by the registry and the identity allocator.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory [`KeyValueStore`], used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_overwrites_values() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn memory_store_with_entries() {
        let store = MemoryStore::with_entries([(COUNTER_KEY, "9")]);
        assert_eq!(store.get(COUNTER_KEY).unwrap().as_deref(), Some("9"));
    }
}
