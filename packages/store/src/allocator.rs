//! Monotonic incident identifier allocation.

use incident_map_incident_models::IncidentId;

use crate::{PersistentStore, StoreError};

/// Issues unique, strictly increasing incident ids.
///
/// The counter is written through to storage before an id is handed out,
/// so an id is never issued twice even across restarts.
#[derive(Debug)]
pub struct IdentityAllocator {
    next: u64,
    store: PersistentStore,
}

impl IdentityAllocator {
    /// Creates an allocator whose first id is `next`.
    #[must_use]
    pub const fn new(next: u64, store: PersistentStore) -> Self {
        Self { next, store }
    }

    /// Returns the current counter value and advances it by one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the advanced counter cannot be persisted;
    /// the counter is left unchanged in that case.
    pub fn next(&mut self) -> Result<IncidentId, StoreError> {
        let id = self.next;
        self.store.save_counter(id + 1)?;
        self.next = id + 1;
        log::debug!("Allocated incident id {id}");
        Ok(IncidentId(id))
    }

    /// The id the next call to [`Self::next`] will return.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{COUNTER_KEY, KeyValueStore, MemoryStore};

    #[test]
    fn issues_increasing_ids_and_writes_through() {
        let backend = Arc::new(MemoryStore::new());
        let mut allocator = IdentityAllocator::new(3, PersistentStore::new(backend.clone()));

        assert_eq!(allocator.next().unwrap(), IncidentId(3));
        assert_eq!(backend.get(COUNTER_KEY).unwrap().as_deref(), Some("4"));
        assert_eq!(allocator.next().unwrap(), IncidentId(4));
        assert_eq!(backend.get(COUNTER_KEY).unwrap().as_deref(), Some("5"));
        assert_eq!(allocator.peek(), 5);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn failed_write_does_not_advance() {
        let mut allocator = IdentityAllocator::new(7, PersistentStore::new(Arc::new(FailingStore)));
        assert!(allocator.next().is_err());
        assert_eq!(allocator.peek(), 7);
    }
}
