//! Mapping from internal failures to HTTP responses.
//!
//! Every status code and message the API can emit for a failed request is
//! decided in `error_response`; call sites never build error bodies themselves.

use airq_weather::{MissingData, ResolveError};
use serde::Serialize;
use std::convert::Infallible;
use warp::http::header::{HeaderValue, RETRY_AFTER};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

pub const MSG_CITY_REQUIRED: &str = "City parameter is required";
pub const MSG_CITY_NOT_FOUND: &str = "City not found";
pub const MSG_RATE_LIMITED: &str = "Too many requests from this IP, please try again later";
pub const MSG_AQI_MISSING: &str = "Failed to get AQI data";
pub const MSG_WEATHER_MISSING: &str = "Failed to get weather data";
pub const MSG_UPSTREAM_UNAVAILABLE: &str = "Failed to fetch AQI/Weather data";

/// JSON error body: `{ "error": "..." }`
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Rejection carrying a request failure out of a filter
#[derive(Debug)]
pub struct ApiRejection(pub ResolveError);

impl warp::reject::Reject for ApiRejection {}

/// Status and caller-facing message for a request failure.
pub fn error_response(err: &ResolveError) -> (StatusCode, &'static str) {
    match err {
        ResolveError::InvalidInput => (StatusCode::BAD_REQUEST, MSG_CITY_REQUIRED),
        ResolveError::CityNotFound(_) => (StatusCode::NOT_FOUND, MSG_CITY_NOT_FOUND),
        ResolveError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, MSG_RATE_LIMITED),
        ResolveError::UpstreamDataMissing(MissingData::Pollution) => {
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_AQI_MISSING)
        }
        ResolveError::UpstreamDataMissing(MissingData::Weather) => {
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_WEATHER_MISSING)
        }
        ResolveError::UpstreamUnavailable(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_UPSTREAM_UNAVAILABLE)
        }
    }
}

pub fn json_error(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: message }), status)
        .into_response()
}

/// Full HTTP response for a request failure
pub fn error_reply(err: &ResolveError) -> Response {
    let (status, message) = error_response(err);
    let mut response = json_error(status, message);

    if let ResolveError::RateLimited { retry_after_secs } = err {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(*retry_after_secs));
    }

    response
}

/// Turn any rejection into a JSON error response
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(ApiRejection(e)) = err.find::<ApiRejection>() {
        return Ok(error_reply(e));
    }

    if err.is_not_found() {
        return Ok(json_error(StatusCode::NOT_FOUND, "Not found"));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    tracing::error!("Unhandled rejection: {:?}", err);
    Ok(json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
}
