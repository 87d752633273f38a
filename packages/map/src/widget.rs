//! The boundary to the base-map widget.

use incident_map_incident_models::{IncidentId, IncidentStatus, LatLng};

use crate::MarkerKey;

/// Popup content attached to a marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Popup {
    /// Pending marker while the address is being looked up.
    Locating {
        /// Clicked coordinate.
        latlng: LatLng,
    },
    /// Pending marker with its address and the "Report Emergency" action.
    Report {
        /// Resolved address or coordinate fallback.
        address: String,
    },
    /// Marker of a stored incident.
    Incident {
        /// Incident id.
        id: IncidentId,
        /// Incident category.
        kind: String,
        /// Stored location string.
        location: String,
        /// Current status.
        status: IncidentStatus,
    },
}

/// Commands the controller issues to the base map.
///
/// The widget owns rendering; the controller only holds the handles it
/// returns, and only through [`crate::MarkerRefBinding`].
pub trait MapWidget {
    /// Live handle to a mounted marker.
    type Marker;

    /// Mounts a marker at `at` and returns its handle.
    fn place_marker(&mut self, key: MarkerKey, at: LatLng) -> Self::Marker;

    /// Unmounts a marker.
    fn remove_marker(&mut self, marker: &Self::Marker);

    /// Replaces a marker's popup content.
    fn set_popup(&mut self, marker: &Self::Marker, popup: Popup);

    /// Opens a marker's popup.
    fn open_popup(&mut self, marker: &Self::Marker);

    /// Pans and zooms the view to `center`.
    fn fly_to(&mut self, center: LatLng, zoom: f64);
}
