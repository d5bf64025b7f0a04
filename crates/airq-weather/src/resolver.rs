//! Request orchestration: validate, consult the cache, fetch on a miss.
//!
//! The upstream fetch runs in two phases. Geocoding must succeed first;
//! pollution and weather are then requested concurrently and both must
//! succeed before a result is assembled and cached.

use crate::cache::ResultCache;
use crate::geocode::normalize_city;
use crate::provider::UpstreamProvider;
use crate::types::{MissingData, ResolveError, UnifiedResult};
use std::sync::Arc;
use tracing::instrument;

pub struct Resolver<P> {
    provider: P,
    cache: Arc<ResultCache>,
}

impl<P: UpstreamProvider> Resolver<P> {
    pub fn new(provider: P, cache: Arc<ResultCache>) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Resolve a city query to its merged air quality and weather data.
    ///
    /// # Errors
    /// `InvalidInput` for a blank query, `CityNotFound` when geocoding
    /// yields nothing, `UpstreamDataMissing` when a record is absent and
    /// `UpstreamUnavailable` for any transport failure.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<Arc<UnifiedResult>, ResolveError> {
        let key = normalize_city(query).ok_or(ResolveError::InvalidInput)?;

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(city = %key, "Cache hit");
            return Ok(hit);
        }
        tracing::debug!(city = %key, "Cache miss");

        let result = match self.fetch(query).await {
            Ok(result) => Arc::new(result),
            Err(e) => {
                log_failure(&key, &e);
                return Err(e);
            }
        };

        tracing::info!(
            city = %key,
            aqi = result.aqi.main.aqi.description(),
            temp = result.weather.temp,
            "Resolved air quality"
        );

        self.cache.set(key, Arc::clone(&result));
        Ok(result)
    }

    async fn fetch(&self, query: &str) -> Result<UnifiedResult, ResolveError> {
        // Phase 1: coordinates
        let matches = self.provider.geocode(query).await?;
        let first = matches
            .first()
            .ok_or_else(|| ResolveError::CityNotFound(query.trim().to_string()))?;
        let coord = first.coordinate();
        tracing::debug!(place = %first.label(), lat = coord.lat, lon = coord.lon, "Geocoded");

        // Phase 2: independent lookups at those coordinates
        let (samples, weather) = tokio::try_join!(
            self.provider.pollution(coord),
            self.provider.weather(coord)
        )?;

        let aqi = samples
            .into_iter()
            .next()
            .ok_or(ResolveError::UpstreamDataMissing(MissingData::Pollution))?;
        let weather = weather.ok_or(ResolveError::UpstreamDataMissing(MissingData::Weather))?;

        Ok(UnifiedResult::assemble(coord, aqi, weather))
    }
}

fn log_failure(city: &str, err: &ResolveError) {
    match err {
        ResolveError::UpstreamUnavailable(cause) if cause.is_upstream_fault() => {
            tracing::error!(city, stage = %cause.stage(), "Upstream error: {}", cause);
        }
        ResolveError::UpstreamUnavailable(cause) => {
            tracing::warn!(city, stage = %cause.stage(), "Upstream unreachable: {}", cause);
        }
        ResolveError::UpstreamDataMissing(what) => {
            tracing::warn!(city, "Upstream returned no {} data", what);
        }
        ResolveError::CityNotFound(_) => {
            tracing::info!(city, "City not found");
        }
        ResolveError::InvalidInput | ResolveError::RateLimited { .. } => {}
    }
}
