//! Filter composition for the HTTP API.
//!
//! Every request under `/api/` passes the throttle gate exactly once before
//! it is routed; rejections are turned into JSON bodies and CORS headers are
//! added last so browsers can read error messages too.

use crate::errors::{handle_rejection, ApiRejection};
use crate::handlers;
use crate::state::AppState;
use airq_weather::{Quota, Resolver, ThrottleGate, UpstreamProvider};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::path::Tail;
use warp::{Filter, Rejection, Reply};

/// All routes, with rejection recovery and CORS applied
pub fn routes<P>(state: AppState<P>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    P: UpstreamProvider + 'static,
{
    api(state).recover(handle_rejection).with(cors())
}

fn api<P>(state: AppState<P>) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone
where
    P: UpstreamProvider + 'static,
{
    let air_quality = warp::path("airquality")
        .and(end_or_slash())
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_resolver(state.resolver))
        .and_then(handlers::air_quality::<P>);

    let not_found = warp::any().and_then(handlers::api_not_found);

    warp::path("api")
        .and(throttled(state.throttle))
        .and(air_quality.or(not_found).unify())
        .map(|quota: Quota, response: warp::reply::Response| {
            handlers::with_quota_headers(response, quota)
        })
}

/// End of the path, tolerating a trailing slash
fn end_or_slash() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path::tail()
        .and_then(|tail: Tail| async move {
            if tail.as_str().trim_end_matches('/').is_empty() {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
}

/// Count the request against the caller's window, rejecting once exhausted
fn throttled(
    throttle: Arc<ThrottleGate>,
) -> impl Filter<Extract = (Quota,), Error = Rejection> + Clone {
    warp::addr::remote()
        .and(warp::any().map(move || Arc::clone(&throttle)))
        .and_then(|addr: Option<SocketAddr>, throttle: Arc<ThrottleGate>| async move {
            throttle
                .check(&client_identity(addr))
                .map_err(|e| warp::reject::custom(ApiRejection(e)))
        })
}

fn with_resolver<P>(
    resolver: Arc<Resolver<P>>,
) -> impl Filter<Extract = (Arc<Resolver<P>>,), Error = Infallible> + Clone
where
    P: Send + Sync + 'static,
{
    warp::any().map(move || Arc::clone(&resolver))
}

/// Throttle key for a peer address
pub fn client_identity(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["content-type"])
}
