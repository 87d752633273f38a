//! Compile-time registry of reverse geocoding service configurations.
//!
//! Each provider is defined in a TOML file under `services/`. The registry
//! embeds these at compile time and exposes them via [`all_services`],
//! [`enabled_services`] and [`primary_service`].

use std::sync::Arc;

use serde::Deserialize;

use crate::locationiq::LocationIqClient;
use crate::nominatim::NominatimClient;
use crate::{GeocodeError, ReverseGeocoder};

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"locationiq"`, `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Preference order; lower values win.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// `LocationIQ` reverse geocoder.
    LocationIq {
        /// Endpoint URL (e.g., `"https://us1.locationiq.com/v1/reverse"`).
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// Maximum requests per UTC day.
        #[serde(default)]
        daily_quota: Option<u32>,
    },
    /// Nominatim / `OpenStreetMap` reverse geocoder.
    Nominatim {
        /// Endpoint URL (e.g., `"https://nominatim.openstreetmap.org/reverse"`).
        base_url: String,
        /// `User-Agent` required by the usage policy.
        user_agent: String,
        /// Minimum delay between requests in milliseconds.
        rate_limit_ms: u64,
        /// Maximum requests per UTC day.
        #[serde(default)]
        daily_quota: Option<u32>,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's endpoint URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::LocationIq { base_url, .. }
            | ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    /// Minimum delay between requests in milliseconds.
    #[must_use]
    pub const fn rate_limit_ms(&self) -> u64 {
        match &self.provider {
            ProviderConfig::LocationIq { rate_limit_ms, .. }
            | ProviderConfig::Nominatim { rate_limit_ms, .. } => *rate_limit_ms,
        }
    }

    /// Maximum requests per UTC day, if limited.
    #[must_use]
    pub const fn daily_quota(&self) -> Option<u32> {
        match &self.provider {
            ProviderConfig::LocationIq { daily_quota, .. }
            | ProviderConfig::Nominatim { daily_quota, .. } => *daily_quota,
        }
    }

    /// Builds the client for this service.
    ///
    /// `api_key` overrides the key read from the service's `api_key_env`
    /// environment variable; it is ignored by providers without keys.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn build(&self, api_key: Option<String>) -> Result<Arc<dyn ReverseGeocoder>, GeocodeError> {
        match &self.provider {
            ProviderConfig::LocationIq {
                base_url,
                api_key_env,
                ..
            } => {
                let key = api_key.or_else(|| std::env::var(api_key_env).ok());
                if key.is_none() {
                    log::warn!(
                        "{} has no API key (set {api_key_env}); addresses will fall back to coordinates",
                        self.name
                    );
                }
                Ok(Arc::new(LocationIqClient::new(
                    reqwest::Client::new(),
                    base_url,
                    key,
                )))
            }
            ProviderConfig::Nominatim {
                base_url,
                user_agent,
                ..
            } => Ok(Arc::new(NominatimClient::new(base_url, user_agent)?)),
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("locationiq", include_str!("../services/locationiq.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding service '{name}': {e}"))
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut services: Vec<GeocodingService> =
        all_services().into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Returns the service with the given id, enabled or not.
#[must_use]
pub fn service_by_id(id: &str) -> Option<GeocodingService> {
    all_services().into_iter().find(|s| s.id == id)
}

/// Returns the highest-priority enabled service.
#[must_use]
pub fn primary_service() -> Option<GeocodingService> {
    enabled_services().into_iter().next()
}
