//! Always-succeeding address resolution for map clicks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use incident_map_incident_models::LatLng;

use crate::rate_limit::{QuotaTracker, RateLimiter};
use crate::service_registry::GeocodingService;
use crate::{GeocodeError, ReverseGeocoder, fallback_address};

/// Default spacing between provider requests.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(1);

/// Resolves coordinates to addresses, falling back to the coordinate
/// string on any failure.
///
/// Exactly one provider request is made per [`Self::resolve`] call, after
/// waiting for the rate limiter and only if the daily quota allows it.
pub struct GeocodingResolver {
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    limiter: RateLimiter,
    quota: Option<QuotaTracker>,
}

impl std::fmt::Debug for GeocodingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodingResolver")
            .field("provider", &self.geocoder.as_ref().map(|g| g.provider()))
            .field("limiter", &self.limiter)
            .field("quota", &self.quota)
            .finish()
    }
}

impl GeocodingResolver {
    /// Wraps `geocoder` with a rate limit and an optional daily quota.
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        min_interval: Duration,
        daily_quota: Option<u32>,
    ) -> Self {
        Self {
            geocoder: Some(geocoder),
            limiter: RateLimiter::new(min_interval),
            quota: daily_quota.map(QuotaTracker::new),
        }
    }

    /// A resolver with no provider; every lookup yields the fallback.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            geocoder: None,
            limiter: RateLimiter::new(DEFAULT_RATE_LIMIT),
            quota: None,
        }
    }

    /// Builds a resolver for a configured service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider client cannot be built.
    pub fn from_service(
        service: &GeocodingService,
        api_key: Option<String>,
    ) -> Result<Self, GeocodeError> {
        let geocoder = service.build(api_key)?;
        log::info!("Reverse geocoding via {} ({})", service.name, service.base_url());
        Ok(Self::new(
            geocoder,
            Duration::from_millis(service.rate_limit_ms()),
            service.daily_quota(),
        ))
    }

    /// Resolves `point` to an address.
    ///
    /// Never fails: provider errors, exhausted quota and a missing provider
    /// all yield [`fallback_address`].
    pub async fn resolve(&self, point: LatLng) -> String {
        match self.try_resolve(point).await {
            Ok(address) => address,
            Err(e) => {
                log::warn!("Reverse geocoding failed for {point:?}, using coordinates: {e}");
                fallback_address(point)
            }
        }
    }

    async fn try_resolve(&self, point: LatLng) -> Result<String, GeocodeError> {
        let geocoder = self.geocoder.as_ref().ok_or(GeocodeError::MissingApiKey)?;

        if let Some(quota) = &self.quota
            && !quota.try_consume(Utc::now().date_naive())
        {
            return Err(GeocodeError::QuotaExceeded {
                limit: quota.limit(),
            });
        }

        self.limiter.acquire().await;
        let address = geocoder.reverse(point).await?;
        log::debug!("{} resolved {point:?} to {address}", geocoder.provider());
        Ok(address)
    }
}
