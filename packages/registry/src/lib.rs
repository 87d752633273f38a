#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Authoritative in-memory incident collection.
//!
//! [`IncidentRegistry`] is the single source of truth every view reads
//! from. It only changes through [`IncidentRegistry::add`],
//! [`IncidentRegistry::change_status`] and [`IncidentRegistry::delete`],
//! all keyed by [`IncidentId`]. After each mutation the collection is
//! re-sorted by `time_reported`, the revision is bumped, and the whole
//! collection is written to the [`PersistentStore`] before the call
//! returns.

use chrono::{DateTime, Utc};
use incident_map_auth::Session;
use incident_map_incident_models::{
    Incident, IncidentDraft, IncidentId, IncidentStatus, sort_by_time_reported,
};
use incident_map_store::{IdentityAllocator, PersistentStore, Snapshot, StoreError};
use thiserror::Error;

/// Errors from registry mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The mutation needs a logged-in session.
    #[error("Cannot {action}. Please log in to {action}")]
    Unauthorized {
        /// What the user tried to do (e.g. "delete incidents").
        action: &'static str,
    },

    /// No incident has this id.
    #[error("Incident {0} not found")]
    NotFound(IncidentId),

    /// Persisting the change failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// The incident collection plus its identity allocator.
#[derive(Debug)]
pub struct IncidentRegistry {
    incidents: Vec<Incident>,
    allocator: IdentityAllocator,
    store: PersistentStore,
    revision: u64,
}

impl IncidentRegistry {
    /// Loads persisted state (or the seed) from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] if the stored state is corrupt or
    /// was already loaded.
    pub fn load(store: PersistentStore) -> Result<Self, RegistryError> {
        let snapshot = store.load()?;
        Ok(Self::from_snapshot(snapshot, store))
    }

    /// Builds a registry from already-loaded state. The counter is raised
    /// past every id in the snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot, store: PersistentStore) -> Self {
        let mut incidents = snapshot.incidents;
        sort_by_time_reported(&mut incidents);
        let next_free = incidents
            .iter()
            .map(|i| i.id.value() + 1)
            .max()
            .unwrap_or(0);
        Self {
            incidents,
            allocator: IdentityAllocator::new(snapshot.counter.max(next_free), store.clone()),
            store,
            revision: 0,
        }
    }

    /// All incidents, oldest report first.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Looks up an incident by id.
    #[must_use]
    pub fn get(&self, id: IncidentId) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id == id)
    }

    /// Number of incidents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Incremented by every successful mutation; lets derived views tell
    /// whether they are stale.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The id the next created incident will get.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.allocator.peek()
    }

    /// Creates an `OPEN` incident from `draft` with a freshly allocated id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] if the counter cannot be persisted
    /// (nothing is created) or the collection cannot be written (the
    /// incident is kept in memory).
    pub fn add(
        &mut self,
        draft: IncidentDraft,
        time_reported: DateTime<Utc>,
    ) -> Result<Incident, RegistryError> {
        let id = self.allocator.next()?;
        assert!(
            self.get(id).is_none(),
            "identity allocator issued duplicate id {id}"
        );

        let incident = Incident::from_draft(id, draft, time_reported);
        log::info!("Created incident {id} ({}) at {}", incident.kind, incident.location);
        self.incidents.push(incident.clone());
        self.commit()?;
        Ok(incident)
    }

    /// Replaces the status of incident `id`, preserving every other field.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::Unauthorized`] if `session` is not logged in
    /// * [`RegistryError::NotFound`] if no incident has this id
    /// * [`RegistryError::Store`] if the collection cannot be written
    pub fn change_status(
        &mut self,
        session: &Session,
        id: IncidentId,
        status: IncidentStatus,
    ) -> Result<Incident, RegistryError> {
        require_login(session, "change status")?;

        let slot = self
            .incidents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        log::info!("Incident {id} status {} -> {status}", slot.status);
        *slot = slot.with_status(status);
        let updated = slot.clone();

        self.commit()?;
        Ok(updated)
    }

    /// Removes incident `id`. Its id is never issued again.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::Unauthorized`] if `session` is not logged in
    /// * [`RegistryError::NotFound`] if no incident has this id
    /// * [`RegistryError::Store`] if the collection cannot be written
    pub fn delete(&mut self, session: &Session, id: IncidentId) -> Result<Incident, RegistryError> {
        require_login(session, "delete incidents")?;

        let index = self
            .incidents
            .iter()
            .position(|i| i.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        let removed = self.incidents.remove(index);
        log::info!("Deleted incident {id}");

        self.commit()?;
        Ok(removed)
    }

    fn commit(&mut self) -> Result<(), RegistryError> {
        sort_by_time_reported(&mut self.incidents);
        self.revision += 1;
        self.store.save_incidents(&self.incidents).map_err(|e| {
            log::error!("Failed to persist incidents: {e}");
            RegistryError::from(e)
        })
    }
}

fn require_login(session: &Session, action: &'static str) -> Result<(), RegistryError> {
    if session.is_authenticated() {
        Ok(())
    } else {
        log::warn!("Rejected unauthenticated attempt to {action}");
        Err(RegistryError::Unauthorized { action })
    }
}
