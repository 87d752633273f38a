#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident, coordinate and viewport types shared across the incident map.
//!
//! These types are the shape of the persisted incident collection as well
//! as the in-memory registry. Field names serialize in `camelCase` so the
//! stored JSON matches what the browser front end reads and writes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique, never reused incident identifier issued by the identity
/// allocator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IncidentId(pub u64);

impl IncidentId {
    /// Returns the raw numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Incident status, compared by exact string.
///
/// The set is open-ended: anything stored is kept verbatim, but the
/// application only ever produces [`IncidentStatus::OPEN`] and
/// [`IncidentStatus::RESOLVED`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentStatus(String);

impl IncidentStatus {
    /// Raw value of the open status.
    pub const OPEN: &'static str = "OPEN";
    /// Raw value of the resolved status.
    pub const RESOLVED: &'static str = "RESOLVED";

    /// A newly reported incident.
    #[must_use]
    pub fn open() -> Self {
        Self(Self::OPEN.to_string())
    }

    /// An incident that has been dealt with.
    #[must_use]
    pub fn resolved() -> Self {
        Self(Self::RESOLVED.to_string())
    }

    /// Wraps an arbitrary status string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The status offered by the "change status" action: `RESOLVED` for an
    /// open incident, `OPEN` for anything else.
    #[must_use]
    pub fn toggled(&self) -> Self {
        if self.is_open() {
            Self::resolved()
        } else {
            Self::open()
        }
    }

    /// Whether this is exactly `OPEN`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0 == Self::OPEN
    }

    /// Whether this is exactly `RESOLVED`.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0 == Self::RESOLVED
    }

    /// Returns the status string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A WGS84 coordinate pair in degrees.
///
/// Serialized as a `[lat, lng]` array. The out-of-range pair `(200, 200)`
/// ([`LatLng::UNSET`]) marks an incident without a coordinate; it lies
/// outside every real viewport so it can never pass a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl LatLng {
    /// Sentinel for "no coordinate".
    pub const UNSET: Self = Self {
        lat: 200.0,
        lng: 200.0,
    };

    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether this is a real coordinate (inside ±90 / ±180).
    #[must_use]
    pub fn is_set(self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::UNSET
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lng]
    }
}

/// The visible map viewport, described by its north-east and south-west
/// corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    /// North-east corner.
    pub north_east: LatLng,
    /// South-west corner.
    pub south_west: LatLng,
}

impl MapBounds {
    /// Creates bounds from the two corners.
    #[must_use]
    pub const fn new(north_east: LatLng, south_west: LatLng) -> Self {
        Self {
            north_east,
            south_west,
        }
    }

    /// Whether `point` lies strictly inside the rectangle. Points on an edge
    /// are outside.
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat > self.south_west.lat
            && point.lat < self.north_east.lat
            && point.lng > self.south_west.lng
            && point.lng < self.north_east.lng
    }
}

/// One reported incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Identifier, immutable after creation.
    pub id: IncidentId,
    /// Resolved address, or the coordinate fallback string.
    pub location: String,
    /// Free-text incident category (e.g. "medical").
    #[serde(rename = "type")]
    pub kind: String,
    /// When the incident was reported. Never changes.
    pub time_reported: DateTime<Utc>,
    /// Current status.
    pub status: IncidentStatus,
    /// Marker position; [`LatLng::UNSET`] when absent from stored data.
    #[serde(default)]
    pub latlng: LatLng,
    /// Name of the reporter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    /// Reporter's phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Image URL or data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Incident {
    /// Builds a new `OPEN` incident from a submitted draft.
    #[must_use]
    pub fn from_draft(id: IncidentId, draft: IncidentDraft, time_reported: DateTime<Utc>) -> Self {
        Self {
            id,
            location: draft.location,
            kind: draft.kind,
            time_reported,
            status: IncidentStatus::open(),
            latlng: draft.latlng,
            reported_by: draft.reported_by,
            phone_number: draft.phone_number,
            comments: draft.comments,
            image: draft.image,
        }
    }

    /// Returns a copy carrying `status`; every other field is preserved.
    #[must_use]
    pub fn with_status(&self, status: IncidentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// The user-supplied part of an incident, as captured by the report form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncidentDraft {
    /// Address shown in the form (prefilled from geocoding, editable).
    pub location: String,
    /// Incident category.
    pub kind: String,
    /// Where the pending marker was placed.
    pub latlng: LatLng,
    /// Name of the reporter.
    pub reported_by: Option<String>,
    /// Reporter's phone number.
    pub phone_number: Option<String>,
    /// Additional details.
    pub comments: Option<String>,
    /// Image URL or data URI.
    pub image: Option<String>,
}

/// Sorts incidents by `time_reported` ascending, keeping insertion order
/// for equal timestamps.
pub fn sort_by_time_reported(incidents: &mut [Incident]) {
    incidents.sort_by_key(|incident| incident.time_reported);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(id: u64, latlng: LatLng) -> Incident {
        Incident {
            id: IncidentId(id),
            location: "Somewhere".to_string(),
            kind: "medical".to_string(),
            time_reported: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            status: IncidentStatus::open(),
            latlng,
            reported_by: None,
            phone_number: None,
            comments: None,
            image: None,
        }
    }

    #[test]
    fn unset_sentinel_is_not_a_coordinate() {
        assert!(!LatLng::UNSET.is_set());
        assert!(LatLng::new(49.28, -123.12).is_set());
        assert_eq!(LatLng::default(), LatLng::UNSET);
    }

    #[test]
    fn bounds_exclude_edges() {
        let bounds = MapBounds::new(LatLng::new(50.0, -122.0), LatLng::new(49.0, -124.0));
        assert!(bounds.contains(LatLng::new(49.5, -123.0)));
        assert!(!bounds.contains(LatLng::new(50.0, -123.0)));
        assert!(!bounds.contains(LatLng::new(49.5, -124.0)));
        assert!(!bounds.contains(LatLng::new(51.0, -123.0)));
        assert!(!bounds.contains(LatLng::UNSET));
    }

    #[test]
    fn toggled_status_flips_open_and_resolved() {
        assert_eq!(IncidentStatus::open().toggled(), IncidentStatus::resolved());
        assert_eq!(IncidentStatus::resolved().toggled(), IncidentStatus::open());
        assert_eq!(IncidentStatus::new("PENDING").toggled(), IncidentStatus::open());
    }

    #[test]
    fn serializes_in_stored_shape() {
        let value = serde_json::to_value(incident(7, LatLng::new(49.3, -123.1))).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["type"], "medical");
        assert_eq!(value["status"], "OPEN");
        assert_eq!(value["latlng"], serde_json::json!([49.3, -123.1]));
        assert_eq!(value["timeReported"], "2025-03-01T10:00:00Z");
        assert!(value.get("reportedBy").is_none());
    }

    #[test]
    fn missing_latlng_deserializes_to_sentinel() {
        let parsed: Incident = serde_json::from_value(serde_json::json!({
            "id": 1,
            "location": "Unknown",
            "type": "fire",
            "timeReported": "2025-03-01T10:00:00Z",
            "status": "OPEN",
            "reportedBy": "Sam"
        }))
        .unwrap();
        assert_eq!(parsed.latlng, LatLng::UNSET);
        assert_eq!(parsed.reported_by.as_deref(), Some("Sam"));
    }

    #[test]
    fn with_status_preserves_other_fields() {
        let mut original = incident(3, LatLng::new(49.0, -123.0));
        original.comments = Some("smoke".to_string());
        let updated = original.with_status(IncidentStatus::resolved());
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.time_reported, original.time_reported);
        assert_eq!(updated.comments, original.comments);
        assert!(updated.status.is_resolved());
    }
}
