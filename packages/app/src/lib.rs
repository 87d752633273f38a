#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Emergency incident map application state.
//!
//! [`IncidentApp`] wires the incident registry, the map interaction
//! controller, the geocoding resolver, the detail panel and the login
//! session together. It holds no rendering code: a host drives it with
//! user events and renders what it exposes through a
//! [`MapWidget`](incident_map_map::MapWidget) implementation, the table
//! rows and the detail panel view.

pub mod app;
pub mod config;
pub mod table;

pub use app::{IncidentApp, Notification, NotificationLevel};
pub use config::AppConfig;
pub use table::{IncidentDetails, IncidentRow, StatusBadge};

use incident_map_auth::AuthError;
use incident_map_geocoder::GeocodeError;
use incident_map_map::FormError;
use incident_map_registry::RegistryError;
use incident_map_store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`IncidentApp`].
#[derive(Debug, Error)]
pub enum AppError {
    /// Loading or saving incidents failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A registry mutation was refused or failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The report form could not be submitted.
    #[error(transparent)]
    Form(#[from] FormError),

    /// The geocoding client could not be built.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// The credential store could not be read.
    #[error(transparent)]
    Auth(#[from] AuthError),
}
