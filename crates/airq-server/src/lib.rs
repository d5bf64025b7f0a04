//! HTTP front end for airq
//!
//! Exposes `GET /api/airquality?city=<name>` over warp.

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use errors::{error_response, ErrorBody};
pub use routes::routes;
pub use state::AppState;

use airq_core::{AppError, ConfigError};
use airq_weather::{ResultCache, ThrottleGate, UpstreamProvider};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How often expired cache entries and throttle counters are dropped
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Parse `host:port` into a socket address
///
/// # Errors
/// `ConfigError::Invalid` when the host is not an IP address.
pub fn listen_addr(host: &str, port: u16) -> Result<SocketAddr, AppError> {
    let ip = host
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("server.host is not an IP address: {}", host)))?;
    Ok(SocketAddr::new(ip, port))
}

/// Serve the API until `shutdown` resolves.
///
/// # Errors
/// Fails when the listener cannot be bound.
pub async fn serve<P, S>(state: AppState<P>, addr: SocketAddr, shutdown: S) -> Result<(), AppError>
where
    P: UpstreamProvider + 'static,
    S: Future<Output = ()> + Send + 'static,
{
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| AppError::Other(anyhow::anyhow!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Server running at http://{}", bound);
    server.await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically purge expired cache entries and throttle counters.
pub fn spawn_purge_task(
    cache: Arc<ResultCache>,
    throttle: Arc<ThrottleGate>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let entries = cache.purge_expired();
            let clients = throttle.purge_expired();
            if entries > 0 || clients > 0 {
                tracing::debug!(
                    entries,
                    clients,
                    cached = cache.len(),
                    tracked = throttle.tracked(),
                    "Purged expired state"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr() {
        let addr = listen_addr("127.0.0.1", 5000).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn test_listen_addr_rejects_hostname() {
        let err = listen_addr("localhost", 5000).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_purge_task_drops_idle_clients() {
        let cache = Arc::new(ResultCache::default());
        let throttle = Arc::new(ThrottleGate::new(5, Duration::from_millis(1)));
        throttle.check("10.0.0.1").unwrap();
        assert_eq!(throttle.tracked(), 1);

        let task = spawn_purge_task(
            Arc::clone(&cache),
            Arc::clone(&throttle),
            Duration::from_millis(20),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        task.abort();

        assert_eq!(throttle.tracked(), 0);
        assert!(cache.is_empty());
    }
}
