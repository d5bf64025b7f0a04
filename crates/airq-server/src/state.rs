use airq_core::Config;
use airq_weather::{OpenWeatherClient, Resolver, ResultCache, ThrottleGate, UpstreamProvider};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Shared, explicitly constructed request state
pub struct AppState<P> {
    pub resolver: Arc<Resolver<P>>,
    pub cache: Arc<ResultCache>,
    pub throttle: Arc<ThrottleGate>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            cache: Arc::clone(&self.cache),
            throttle: Arc::clone(&self.throttle),
        }
    }
}

impl<P: UpstreamProvider> AppState<P> {
    pub fn new(provider: P, cache: Arc<ResultCache>, throttle: Arc<ThrottleGate>) -> Self {
        Self {
            resolver: Arc::new(Resolver::new(provider, Arc::clone(&cache))),
            cache,
            throttle,
        }
    }
}

impl AppState<OpenWeatherClient> {
    /// Build the production state from validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = OpenWeatherClient::new(&config.upstream)?;
        let cache = Arc::new(ResultCache::new(Duration::from_secs(config.cache.ttl_secs)));
        let throttle = Arc::new(ThrottleGate::new(
            config.throttle.max_requests,
            Duration::from_secs(config.throttle.window_secs),
        ));

        tracing::info!(
            ttl_secs = cache.ttl().as_secs(),
            max_requests = throttle.max_requests(),
            window_secs = throttle.window().as_secs(),
            "Request state ready"
        );

        Ok(Self::new(provider, cache, throttle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_applies_limits() {
        let mut config = Config::default();
        config.upstream.api_key = "test-key".to_string();
        config.cache.ttl_secs = 120;
        config.throttle.max_requests = 7;
        config.throttle.window_secs = 60;

        let state = AppState::from_config(&config).unwrap();

        assert_eq!(state.cache.ttl(), Duration::from_secs(120));
        assert_eq!(state.throttle.max_requests(), 7);
        assert_eq!(state.throttle.window(), Duration::from_secs(60));
        assert!(state.cache.is_empty());
        assert_eq!(state.throttle.tracked(), 0);
    }
}
