//! Nominatim / `OpenStreetMap` reverse geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum, and
//! the usage policy requires an identifying `User-Agent`.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use async_trait::async_trait;
use incident_map_incident_models::LatLng;

use crate::{GeocodeError, GeocodingProvider, ReverseGeocoder, parse_display_name};

/// Reverse geocoder backed by a Nominatim instance.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// Creates a client for the `/reverse` endpoint at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, point: LatLng) -> Result<String, GeocodeError> {
        let lat = point.lat.to_string();
        let lon = point.lng.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "jsonv2"),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GeocodeError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp.json().await?;
        parse_display_name(&body)
    }

    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Nominatim
    }
}
