#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for the incident map.
//!
//! Turns the coordinate of a map click into a human-readable address.
//! Providers are configured via TOML files in `services/`:
//!
//! 1. **`LocationIQ`** (priority 1): requires an API key, 1 req/sec and a
//!    small daily quota on the free tier.
//! 2. **Nominatim / `OpenStreetMap`** (priority 2, disabled by default):
//!    no key, 1 req/sec.
//!
//! The [`GeocodingResolver`] wraps a provider with rate limiting and a
//! daily quota, and never fails: any error yields the coordinate string
//! from [`fallback_address`], which is stored verbatim as the incident
//! location.

pub mod locationiq;
pub mod nominatim;
pub mod rate_limit;
pub mod resolver;
pub mod service_registry;

use async_trait::async_trait;
use incident_map_incident_models::LatLng;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use resolver::GeocodingResolver;

/// Which provider resolved an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GeocodingProvider {
    /// `LocationIQ` reverse endpoint.
    LocationIq,
    /// Nominatim / `OpenStreetMap`.
    Nominatim,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The daily request quota is used up.
    #[error("Daily quota of {limit} requests exhausted")]
    QuotaExceeded {
        /// Configured daily limit.
        limit: u32,
    },

    /// The provider needs an API key and none is configured.
    #[error("No API key configured")]
    MissingApiKey,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// A provider that maps a coordinate to an address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Looks up the display name for `point`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the response has no
    /// display name.
    async fn reverse(&self, point: LatLng) -> Result<String, GeocodeError>;

    /// Identifies the provider in logs.
    fn provider(&self) -> GeocodingProvider;
}

/// The address used when geocoding is unavailable:
/// `Latitude: {lat}, Longitude: {lng}`.
#[must_use]
pub fn fallback_address(point: LatLng) -> String {
    format!("Latitude: {}, Longitude: {}", point.lat, point.lng)
}

/// Extracts `display_name` from a reverse geocoding response object.
///
/// Both `LocationIQ` and Nominatim answer with a single JSON object; a
/// failed lookup carries an `error` field instead.
pub(crate) fn parse_display_name(body: &serde_json::Value) -> Result<String, GeocodeError> {
    if let Some(error) = body.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), String::from);
        return Err(GeocodeError::Parse { message });
    }

    body.get("display_name")
        .and_then(serde_json::Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(String::from)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing display_name in reverse geocoding response".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_plain_number_formatting() {
        assert_eq!(
            fallback_address(LatLng::new(49.30, -123.10)),
            "Latitude: 49.3, Longitude: -123.1"
        );
        assert_eq!(
            fallback_address(LatLng::new(49.2827, -123.1207)),
            "Latitude: 49.2827, Longitude: -123.1207"
        );
    }

    #[test]
    fn parses_display_name() {
        let body = serde_json::json!({
            "lat": "49.30",
            "lon": "-123.10",
            "display_name": "123 Main St, Vancouver, BC, Canada"
        });
        assert_eq!(
            parse_display_name(&body).unwrap(),
            "123 Main St, Vancouver, BC, Canada"
        );
    }

    #[test]
    fn error_body_is_a_parse_error() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        match parse_display_name(&body) {
            Err(GeocodeError::Parse { message }) => assert_eq!(message, "Unable to geocode"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_display_name_is_a_parse_error() {
        let body = serde_json::json!({ "lat": "1", "lon": "2" });
        assert!(matches!(
            parse_display_name(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn provider_names_are_snake_case() {
        assert_eq!(GeocodingProvider::LocationIq.to_string(), "location_iq");
        assert_eq!(GeocodingProvider::Nominatim.as_ref(), "nominatim");
    }
}
