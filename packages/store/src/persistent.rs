//! Load-once, overwrite-always persistence of the incident collection and
//! the identity counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use incident_map_incident_models::{Incident, sort_by_time_reported};

use crate::{COUNTER_KEY, INCIDENTS_KEY, KeyValueStore, StoreError};

/// Counter value used when nothing is persisted: one past the highest
/// seed id.
pub const INITIAL_COUNTER: u64 = 3;

/// Bundled dataset shown on first run.
const SEED_INCIDENTS: &str = include_str!("../seed/incidents.json");

/// Where a loaded incident collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Read from the backing store.
    Persisted,
    /// No stored collection existed; the bundled seed was used.
    Seed,
}

/// State read from storage at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Incident collection, sorted by `time_reported`.
    pub incidents: Vec<Incident>,
    /// Next identifier to issue.
    pub counter: u64,
    /// Origin of `incidents`.
    pub source: SnapshotSource,
}

/// Persistence facade over a shared [`KeyValueStore`].
///
/// Clones share the backend and the "already loaded" flag.
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
    loaded: Arc<AtomicBool>,
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("loaded", &self.loaded.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl PersistentStore {
    /// Wraps `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            loaded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reads the incident collection and counter.
    ///
    /// Falls back to the bundled seed when no collection is stored. When the
    /// counter is absent it starts one past the highest known id, and never
    /// below [`INITIAL_COUNTER`]. A stored counter is raised to one past the
    /// highest loaded id, so no loaded id is ever issued again.
    ///
    /// # Errors
    ///
    /// * [`StoreError::AlreadyLoaded`] on any call after the first
    /// * [`StoreError::Corrupt`] if either stored value fails to parse
    /// * [`StoreError::Io`] if the backend cannot be read
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return Err(StoreError::AlreadyLoaded);
        }

        let (mut incidents, source) = match self.backend.get(INCIDENTS_KEY)? {
            Some(raw) => (parse_incidents(INCIDENTS_KEY, &raw)?, SnapshotSource::Persisted),
            None => (seed_incidents(), SnapshotSource::Seed),
        };
        sort_by_time_reported(&mut incidents);

        let next_free = next_free_id(&incidents);
        let counter = match self.backend.get(COUNTER_KEY)? {
            Some(raw) => {
                let stored = serde_json::from_str::<u64>(raw.trim()).map_err(|source| {
                    StoreError::Corrupt {
                        key: COUNTER_KEY.to_string(),
                        source,
                    }
                })?;
                if stored < next_free {
                    log::warn!(
                        "Stored counter {stored} is behind the loaded incidents; using {next_free}"
                    );
                }
                stored.max(next_free)
            }
            None => next_free.max(INITIAL_COUNTER),
        };

        log::info!(
            "Loaded {} incidents ({source:?}), next id {counter}",
            incidents.len()
        );

        Ok(Snapshot {
            incidents,
            counter,
            source,
        })
    }

    /// Overwrites both the incident collection and the counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the backend write fails.
    pub fn save(&self, incidents: &[Incident], counter: u64) -> Result<(), StoreError> {
        self.save_incidents(incidents)?;
        self.save_counter(counter)
    }

    /// Overwrites the incident collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the backend write fails.
    pub fn save_incidents(&self, incidents: &[Incident]) -> Result<(), StoreError> {
        let json = serde_json::to_string(incidents)?;
        self.backend.set(INCIDENTS_KEY, &json)
    }

    /// Overwrites the counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend write fails.
    pub fn save_counter(&self, counter: u64) -> Result<(), StoreError> {
        self.backend.set(COUNTER_KEY, &counter.to_string())
    }
}

fn next_free_id(incidents: &[Incident]) -> u64 {
    incidents
        .iter()
        .map(|i| i.id.value() + 1)
        .max()
        .unwrap_or(0)
}

fn parse_incidents(key: &str, raw: &str) -> Result<Vec<Incident>, StoreError> {
    serde_json::from_str(raw).map_err(|source| {
        log::error!("Stored incidents under '{key}' are corrupt: {source}");
        StoreError::Corrupt {
            key: key.to_string(),
            source,
        }
    })
}

/// Returns the bundled seed incidents.
///
/// # Panics
///
/// Panics if the embedded seed JSON is malformed (it is compiled into the
/// binary, so this is caught by the tests below).
#[must_use]
pub fn seed_incidents() -> Vec<Incident> {
    serde_json::from_str(SEED_INCIDENTS)
        .unwrap_or_else(|e| panic!("Failed to parse bundled seed incidents: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileStore, MemoryStore};
    use chrono::{TimeZone, Utc};
    use incident_map_incident_models::{IncidentId, IncidentStatus, LatLng};

    fn memory() -> PersistentStore {
        PersistentStore::new(Arc::new(MemoryStore::new()))
    }

    fn incident(id: u64, hour: u32) -> Incident {
        Incident {
            id: IncidentId(id),
            location: format!("Location {id}"),
            kind: "theft".to_string(),
            time_reported: Utc.with_ymd_and_hms(2025, 2, 1, hour, 0, 0).unwrap(),
            status: IncidentStatus::open(),
            latlng: LatLng::new(49.2, -123.1),
            reported_by: Some("Kim".to_string()),
            phone_number: None,
            comments: Some("bike stolen".to_string()),
            image: None,
        }
    }

    #[test]
    fn seed_has_ids_zero_to_two() {
        let ids: Vec<u64> = seed_incidents().iter().map(|i| i.id.value()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn empty_store_loads_seed_and_initial_counter() {
        let snapshot = memory().load().unwrap();
        assert_eq!(snapshot.source, SnapshotSource::Seed);
        assert_eq!(snapshot.incidents, seed_incidents());
        assert_eq!(snapshot.counter, INITIAL_COUNTER);
    }

    #[test]
    fn second_load_is_rejected() {
        let store = memory();
        store.load().unwrap();
        assert!(matches!(store.load(), Err(StoreError::AlreadyLoaded)));
        assert!(matches!(store.clone().load(), Err(StoreError::AlreadyLoaded)));
    }

    #[test]
    fn save_then_load_round_trips() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let incidents = vec![incident(4, 8), incident(5, 9)];
        PersistentStore::new(backend.clone())
            .save(&incidents, 6)
            .unwrap();

        let snapshot = PersistentStore::new(backend).load().unwrap();
        assert_eq!(snapshot.source, SnapshotSource::Persisted);
        assert_eq!(snapshot.incidents, incidents);
        assert_eq!(snapshot.counter, 6);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let incidents = vec![incident(3, 10)];
        PersistentStore::new(Arc::new(FileStore::new(dir.path())))
            .save(&incidents, 4)
            .unwrap();

        let snapshot = PersistentStore::new(Arc::new(FileStore::new(dir.path())))
            .load()
            .unwrap();
        assert_eq!(snapshot.incidents, incidents);
        assert_eq!(snapshot.counter, 4);
    }

    #[test]
    fn loaded_incidents_are_sorted_by_time() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        PersistentStore::new(backend.clone())
            .save(&[incident(8, 12), incident(9, 7)], 10)
            .unwrap();

        let snapshot = PersistentStore::new(backend).load().unwrap();
        let ids: Vec<u64> = snapshot.incidents.iter().map(|i| i.id.value()).collect();
        assert_eq!(ids, vec![9, 8]);
    }

    #[test]
    fn corrupt_incidents_are_fatal() {
        let store = PersistentStore::new(Arc::new(MemoryStore::with_entries([(
            INCIDENTS_KEY,
            "[{not json",
        )])));
        match store.load() {
            Err(StoreError::Corrupt { key, .. }) => assert_eq!(key, INCIDENTS_KEY),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_counter_is_fatal() {
        let store = PersistentStore::new(Arc::new(MemoryStore::with_entries([(
            COUNTER_KEY,
            "three",
        )])));
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn missing_counter_starts_past_highest_persisted_id() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        PersistentStore::new(backend.clone())
            .save_incidents(&[incident(11, 9)])
            .unwrap();

        let snapshot = PersistentStore::new(backend).load().unwrap();
        assert_eq!(snapshot.counter, 12);
    }

    #[test]
    fn counter_without_collection_is_raised_past_seed_ids() {
        let store = PersistentStore::new(Arc::new(MemoryStore::with_entries([(
            COUNTER_KEY,
            "1",
        )])));
        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.source, SnapshotSource::Seed);
        assert_eq!(snapshot.counter, INITIAL_COUNTER);
    }

    #[test]
    fn stored_counter_ahead_of_ids_is_kept() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        PersistentStore::new(backend.clone())
            .save(&[incident(4, 9)], 20)
            .unwrap();

        let snapshot = PersistentStore::new(backend).load().unwrap();
        assert_eq!(snapshot.counter, 20);
    }

    #[test]
    fn stale_counter_is_raised_past_persisted_ids() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        PersistentStore::new(backend.clone())
            .save(&[incident(7, 9), incident(4, 10)], 5)
            .unwrap();

        let snapshot = PersistentStore::new(backend).load().unwrap();
        assert_eq!(snapshot.counter, 8);
    }
}
