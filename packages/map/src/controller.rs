//! Click-to-report protocol and marker lifecycle.
//!
//! Pending marker states:
//!
//! ```text
//!   Idle --click--> Placed --resolved--> Resolved --submit--> Idle
//!     ^               |                     |
//!     +----cancel-----+---------cancel------+
//! ```
//!
//! A click while a marker is pending replaces it. Each click bumps a
//! generation counter; a geocoding result carrying an older generation is
//! discarded, so a slow lookup never overwrites a newer placement.

use incident_map_incident_models::{Incident, IncidentDraft, IncidentId, LatLng, MapBounds};
use thiserror::Error;

use crate::{DEFAULT_FOCUS_ZOOM, MapWidget, MarkerKey, MarkerRefBinding, Popup};

/// Errors from the report form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// There is no pending marker to report.
    #[error("No location selected. Click the map to place a marker")]
    NothingPending,

    /// The pending marker's address is still being looked up.
    #[error("Location is still being resolved")]
    NotResolved,

    /// A required form field is blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// The pending marker lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingMarker {
    /// No pending marker.
    Idle,
    /// Marker placed, address lookup in flight.
    Placed {
        /// Click generation that placed the marker.
        generation: u64,
        /// Clicked coordinate.
        latlng: LatLng,
    },
    /// Address known; the marker offers "Report Emergency".
    Resolved {
        /// Click generation that placed the marker.
        generation: u64,
        /// Clicked coordinate.
        latlng: LatLng,
        /// Resolved address or coordinate fallback.
        address: String,
    },
}

/// A geocoding job produced by a map click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveRequest {
    /// Click generation the result must be delivered with.
    pub generation: u64,
    /// Coordinate to resolve.
    pub latlng: LatLng,
}

/// Contents of the "Report Emergency" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportForm {
    /// Incident category (required).
    pub kind: String,
    /// Location text (required; prefilled with the resolved address).
    pub location: String,
    /// Reporter's name.
    pub reported_by: String,
    /// Reporter's phone number.
    pub phone_number: String,
    /// Additional details.
    pub comments: String,
    /// Image URL or data URI.
    pub image: String,
}

impl ReportForm {
    /// A blank form prefilled with `location`.
    #[must_use]
    pub fn prefilled(location: &str) -> Self {
        Self {
            location: location.to_string(),
            ..Self::default()
        }
    }

    fn into_draft(self, latlng: LatLng) -> Result<IncidentDraft, FormError> {
        let kind = required(self.kind, "type")?;
        let location = required(self.location, "location")?;
        Ok(IncidentDraft {
            location,
            kind,
            latlng,
            reported_by: optional(self.reported_by),
            phone_number: optional(self.phone_number),
            comments: optional(self.comments),
            image: optional(self.image),
        })
    }
}

fn required(value: String, field: &'static str) -> Result<String, FormError> {
    if value.trim().is_empty() {
        Err(FormError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Owns the map-side interaction state.
#[derive(Debug)]
pub struct MapInteractionController<W: MapWidget> {
    widget: W,
    markers: MarkerRefBinding<W::Marker>,
    pending: PendingMarker,
    generation: u64,
    form: Option<ReportForm>,
    bounds: Option<MapBounds>,
    mounted: bool,
    focus_zoom: f64,
}

impl<W: MapWidget> MapInteractionController<W> {
    /// Creates a controller driving `widget`.
    #[must_use]
    pub fn new(widget: W) -> Self {
        Self {
            widget,
            markers: MarkerRefBinding::new(),
            pending: PendingMarker::Idle,
            generation: 0,
            form: None,
            bounds: None,
            mounted: false,
            focus_zoom: DEFAULT_FOCUS_ZOOM,
        }
    }

    /// Sets the zoom level used by [`Self::focus_incident`].
    #[must_use]
    pub const fn with_focus_zoom(mut self, zoom: f64) -> Self {
        self.focus_zoom = zoom;
        self
    }

    /// The map widget.
    pub const fn widget(&self) -> &W {
        &self.widget
    }

    /// Mutable access to the map widget.
    pub const fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    #[cfg(test)]
    pub(crate) const fn markers(&self) -> &MarkerRefBinding<W::Marker> {
        &self.markers
    }

    /// The pending marker state.
    pub const fn pending(&self) -> &PendingMarker {
        &self.pending
    }

    /// The open report form, if any.
    pub const fn form(&self) -> Option<&ReportForm> {
        self.form.as_ref()
    }

    /// The current viewport bounds, once known.
    pub const fn bounds(&self) -> Option<&MapBounds> {
        self.bounds.as_ref()
    }

    // ── Viewport ─────────────────────────────────────────────────────

    /// Records the initial viewport. Only the first call has any effect;
    /// returns whether it was applied.
    pub fn mount(&mut self, bounds: MapBounds) -> bool {
        if self.mounted {
            log::warn!("Map mounted twice; ignoring {bounds:?}");
            return false;
        }
        self.mounted = true;
        self.bounds = Some(bounds);
        log::debug!("Map mounted with bounds {bounds:?}");
        true
    }

    /// Records the viewport after a pan or zoom has settled.
    pub fn move_end(&mut self, bounds: MapBounds) {
        log::debug!("Map moved to {bounds:?}");
        self.bounds = Some(bounds);
    }

    // ── Pending marker ───────────────────────────────────────────────

    /// Handles a click on empty map: replaces any pending marker with one at
    /// `latlng` and returns the geocoding job for it.
    pub fn click(&mut self, latlng: LatLng) -> ResolveRequest {
        self.clear_pending();

        self.generation += 1;
        let generation = self.generation;

        let marker = self.widget.place_marker(MarkerKey::Pending, latlng);
        self.widget.set_popup(&marker, Popup::Locating { latlng });
        self.widget.open_popup(&marker);
        self.markers.register(MarkerKey::Pending, marker);

        self.pending = PendingMarker::Placed { generation, latlng };
        log::debug!("Map clicked at {latlng:?} (generation {generation})");

        ResolveRequest { generation, latlng }
    }

    /// Delivers a geocoding result. Returns `false` and changes nothing if
    /// the result belongs to a marker that has since been replaced or
    /// cancelled.
    pub fn complete_resolution(&mut self, generation: u64, address: String) -> bool {
        let latlng = match &self.pending {
            PendingMarker::Placed {
                generation: current,
                latlng,
            } if *current == generation => *latlng,
            _ => {
                log::debug!("Discarding stale geocoding result (generation {generation})");
                return false;
            }
        };

        if let Some(marker) = self.markers.get(MarkerKey::Pending) {
            self.widget.set_popup(
                marker,
                Popup::Report {
                    address: address.clone(),
                },
            );
            self.widget.open_popup(marker);
        }

        self.pending = PendingMarker::Resolved {
            generation,
            latlng,
            address,
        };
        true
    }

    /// The popup's "Report Emergency" action: opens the form prefilled with
    /// the resolved address.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::NothingPending`] or [`FormError::NotResolved`]
    /// if there is no resolved marker to report.
    pub fn report_emergency(&mut self) -> Result<&ReportForm, FormError> {
        let address = match &self.pending {
            PendingMarker::Idle => return Err(FormError::NothingPending),
            PendingMarker::Placed { .. } => return Err(FormError::NotResolved),
            PendingMarker::Resolved { address, .. } => address,
        };
        Ok(self.form.insert(ReportForm::prefilled(address)))
    }

    /// Submits the form for the resolved marker.
    ///
    /// On success the pending marker is removed and the returned draft is
    /// ready to be added to the registry. On error nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`FormError`] if no marker is resolved or a required field
    /// is blank.
    pub fn submit(&mut self, form: ReportForm) -> Result<IncidentDraft, FormError> {
        let latlng = match &self.pending {
            PendingMarker::Idle => return Err(FormError::NothingPending),
            PendingMarker::Placed { .. } => return Err(FormError::NotResolved),
            PendingMarker::Resolved { latlng, .. } => *latlng,
        };

        let draft = form.into_draft(latlng)?;
        self.clear_pending();
        Ok(draft)
    }

    /// Dismisses the form or the pending popup without reporting.
    pub fn cancel(&mut self) {
        if self.pending != PendingMarker::Idle {
            log::debug!("Pending marker cancelled");
        }
        self.clear_pending();
    }

    fn clear_pending(&mut self) {
        if let Some(marker) = self.markers.unregister(MarkerKey::Pending) {
            self.widget.remove_marker(&marker);
        }
        self.pending = PendingMarker::Idle;
        self.form = None;
    }

    // ── Incident markers ─────────────────────────────────────────────

    /// Mounts markers for exactly the `visible` incidents, unmounting any
    /// that left the view, and refreshes popups of the rest.
    pub fn sync_markers(&mut self, visible: &[Incident]) {
        let stale = self
            .markers
            .unregister_incidents_unless(|id| visible.iter().any(|incident| incident.id == id));
        for marker in &stale {
            self.widget.remove_marker(marker);
        }

        for incident in visible {
            let key = MarkerKey::Incident(incident.id);
            if !self.markers.contains(key) {
                let marker = self.widget.place_marker(key, incident.latlng);
                self.markers.register(key, marker);
            }
            if let Some(marker) = self.markers.get(key) {
                self.widget.set_popup(marker, incident_popup(incident));
            }
        }
    }

    /// Unmounts an incident's marker, if mounted.
    pub fn forget_incident(&mut self, id: IncidentId) {
        if let Some(marker) = self.markers.unregister(MarkerKey::Incident(id)) {
            self.widget.remove_marker(&marker);
        }
    }

    /// Navigates to `incident`: centers the view on it and opens its popup
    /// if its marker is mounted. Returns the id to select in the detail
    /// panel. Used by both marker clicks and the table's "See More" action.
    pub fn focus_incident(&mut self, incident: &Incident) -> IncidentId {
        self.widget.fly_to(incident.latlng, self.focus_zoom);

        match self.markers.get(MarkerKey::Incident(incident.id)) {
            Some(marker) => self.widget.open_popup(marker),
            None => log::debug!("Incident {} has no mounted marker", incident.id),
        }

        incident.id
    }

    /// Handles a click on incident `id`'s marker.
    ///
    /// Returns `None` if `id` is not among `incidents`.
    pub fn marker_clicked(&mut self, id: IncidentId, incidents: &[Incident]) -> Option<IncidentId> {
        let incident = incidents.iter().find(|incident| incident.id == id)?;
        Some(self.focus_incident(incident))
    }
}

fn incident_popup(incident: &Incident) -> Popup {
    Popup::Incident {
        id: incident.id,
        kind: incident.kind.clone(),
        location: incident.location.clone(),
        status: incident.status.clone(),
    }
}
