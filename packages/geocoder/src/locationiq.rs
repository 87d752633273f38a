//! `LocationIQ` reverse geocoder client.
//!
//! The free tier allows 1 request per second and a few thousand requests
//! per day. Requests without a key are never sent.
//!
//! See <https://docs.locationiq.com/reference/reverse-geocoding>

use async_trait::async_trait;
use incident_map_incident_models::LatLng;

use crate::{GeocodeError, GeocodingProvider, ReverseGeocoder, parse_display_name};

/// Reverse geocoder backed by the `LocationIQ` API.
#[derive(Debug, Clone)]
pub struct LocationIqClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LocationIqClient {
    /// Creates a client. A missing or blank `api_key` makes every lookup
    /// fail with [`GeocodeError::MissingApiKey`].
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Whether an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ReverseGeocoder for LocationIqClient {
    async fn reverse(&self, point: LatLng) -> Result<String, GeocodeError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(GeocodeError::MissingApiKey);
        };

        let lat = point.lat.to_string();
        let lon = point.lng.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", key),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
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
        GeocodingProvider::LocationIq
    }
}
