#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map interaction for the incident map.
//!
//! The base map itself is a black box behind [`MapWidget`]: it reports
//! clicks and settled viewport bounds, and accepts marker and popup
//! commands. [`MapInteractionController`] owns everything in between:
//!
//! * the pending-marker lifecycle (click, geocode, report, submit/cancel),
//! * the [`MarkerRefBinding`] from incident ids to live marker handles,
//! * the current viewport bounds, and
//! * marker-click navigation (pan, open popup, report the selection).
//!
//! [`viewport::filter`] derives the visible incidents from the registry
//! and the current bounds.

pub mod binding;
pub mod controller;
pub mod viewport;
pub mod widget;

pub use binding::{MarkerKey, MarkerRefBinding};
pub use controller::{
    FormError, MapInteractionController, PendingMarker, ReportForm, ResolveRequest,
};
pub use viewport::{VisibleSet, filter};
pub use widget::{MapWidget, Popup};

use incident_map_incident_models::LatLng;

/// Initial map center (Vancouver).
pub const DEFAULT_CENTER: LatLng = LatLng::new(49.2827, -123.1207);

/// Initial zoom level.
pub const DEFAULT_ZOOM: f64 = 13.0;

/// Zoom level used when navigating to an incident.
pub const DEFAULT_FOCUS_ZOOM: f64 = 16.0;
