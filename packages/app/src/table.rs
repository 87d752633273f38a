//! Row and detail view models for the incident table and detail panel.

use chrono::{DateTime, Utc};
use incident_map_incident_models::{Incident, IncidentId};
use strum_macros::{AsRefStr, Display};

/// Shown when no reporter name was given.
pub const ANONYMOUS: &str = "anonymous";
/// Shown when no phone number was given.
pub const NO_PHONE_NUMBER: &str = "no phone number";
/// Shown when no comments were given.
pub const NO_COMMENTS: &str = "no comments";
/// Shown when no image was attached.
pub const NO_IMAGE: &str = "No image provided";

/// Styling class of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum StatusBadge {
    /// Resolved incidents.
    Success,
    /// Everything else.
    Warning,
}

impl StatusBadge {
    /// Badge for `incident`'s status.
    #[must_use]
    pub fn for_incident(incident: &Incident) -> Self {
        if incident.status.is_resolved() {
            Self::Success
        } else {
            Self::Warning
        }
    }
}

/// One row of the incident table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRow {
    /// Incident id, used by the row's "See More" action.
    pub id: IncidentId,
    /// Location text.
    pub location: String,
    /// Incident category.
    pub kind: String,
    /// Report time.
    pub time_reported: DateTime<Utc>,
    /// Status text.
    pub status: String,
    /// Status badge class.
    pub badge: StatusBadge,
}

impl From<&Incident> for IncidentRow {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id,
            location: incident.location.clone(),
            kind: incident.kind.clone(),
            time_reported: incident.time_reported,
            status: incident.status.to_string(),
            badge: StatusBadge::for_incident(incident),
        }
    }
}

/// Detail panel contents with display defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentDetails {
    /// Incident id.
    pub id: IncidentId,
    /// Emergency type, e.g. `fire`.
    pub kind: String,
    /// Resolved address or coordinate text.
    pub location: String,
    /// When the incident was reported.
    pub time_reported: DateTime<Utc>,
    /// Status text, e.g. `OPEN`.
    pub status: String,
    /// Badge class for the status.
    pub badge: StatusBadge,
    /// Reporter name, or [`ANONYMOUS`].
    pub reported_by: String,
    /// Contact number, or [`NO_PHONE_NUMBER`].
    pub phone_number: String,
    /// Free-text comments, or [`NO_COMMENTS`].
    pub comments: String,
    /// Image URL, if one was attached.
    pub image: Option<String>,
    /// Caption for the image slot.
    pub image_caption: String,
}

impl From<&Incident> for IncidentDetails {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id,
            kind: incident.kind.clone(),
            location: incident.location.clone(),
            time_reported: incident.time_reported,
            status: incident.status.to_string(),
            badge: StatusBadge::for_incident(incident),
            reported_by: or_default(incident.reported_by.as_deref(), ANONYMOUS),
            phone_number: or_default(incident.phone_number.as_deref(), NO_PHONE_NUMBER),
            comments: or_default(incident.comments.as_deref(), NO_COMMENTS),
            image: incident.image.clone(),
            image_caption: if incident.image.is_some() {
                String::new()
            } else {
                NO_IMAGE.to_string()
            },
        }
    }
}

fn or_default(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}
