//! Side index from incident ids to live marker handles.
//!
//! The index is never a source of truth. It exists only so popups can be
//! opened imperatively, and is kept in step with marker mount/unmount by
//! explicit [`MarkerRefBinding::register`] / [`MarkerRefBinding::unregister`]
//! calls.

use std::collections::BTreeMap;
use std::fmt;

use incident_map_incident_models::IncidentId;

/// Slot in the binding map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkerKey {
    /// The placed but not yet submitted marker.
    Pending,
    /// A stored incident's marker.
    Incident(IncidentId),
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Incident(id) => write!(f, "incident {id}"),
        }
    }
}

impl MarkerKey {
    /// Numeric form: the incident id, or `-1` for the pending marker.
    #[must_use]
    pub fn raw(self) -> i64 {
        match self {
            Self::Pending => -1,
            Self::Incident(id) => i64::try_from(id.value()).unwrap_or(i64::MAX),
        }
    }
}

/// Mapping from [`MarkerKey`] to a live marker handle.
#[derive(Debug)]
pub struct MarkerRefBinding<M> {
    markers: BTreeMap<MarkerKey, M>,
}

impl<M> Default for MarkerRefBinding<M> {
    fn default() -> Self {
        Self {
            markers: BTreeMap::new(),
        }
    }
}

impl<M> MarkerRefBinding<M> {
    /// Creates an empty binding map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the handle of a newly mounted marker.
    ///
    /// Returns the handle previously bound to `key`, which the caller failed
    /// to unregister; that is logged as a leak.
    pub fn register(&mut self, key: MarkerKey, marker: M) -> Option<M> {
        let previous = self.markers.insert(key, marker);
        if previous.is_some() {
            log::warn!("Marker {key} registered twice without unmount");
        } else {
            log::debug!("Marker {key} mounted");
        }
        previous
    }

    /// Forgets the handle of an unmounted marker.
    pub fn unregister(&mut self, key: MarkerKey) -> Option<M> {
        let removed = self.markers.remove(&key);
        if removed.is_some() {
            log::debug!("Marker {key} unmounted");
        }
        removed
    }

    /// The live handle for `key`, if mounted.
    #[must_use]
    pub fn get(&self, key: MarkerKey) -> Option<&M> {
        self.markers.get(&key)
    }

    /// Whether `key` is mounted.
    #[must_use]
    pub fn contains(&self, key: MarkerKey) -> bool {
        self.markers.contains_key(&key)
    }

    /// Number of mounted markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Unregisters every incident marker whose id fails `keep` and returns
    /// the handles, which the caller must unmount. The pending marker stays.
    pub(crate) fn unregister_incidents_unless(
        &mut self,
        keep: impl Fn(IncidentId) -> bool,
    ) -> Vec<M> {
        let stale: Vec<MarkerKey> = self
            .markers
            .keys()
            .filter(|key| matches!(key, MarkerKey::Incident(id) if !keep(*id)))
            .copied()
            .collect();
        stale
            .into_iter()
            .filter_map(|key| self.unregister(key))
            .collect()
    }
}
