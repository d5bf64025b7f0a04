use crate::errors::{error_reply, json_error};
use airq_weather::{Quota, Resolver, UpstreamProvider};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::{HeaderName, HeaderValue};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::Reply;

/// `GET /api/airquality?city=<name>`
pub async fn air_quality<P>(
    params: HashMap<String, String>,
    resolver: Arc<Resolver<P>>,
) -> Result<Response, Infallible>
where
    P: UpstreamProvider + 'static,
{
    let city = params.get("city").map(String::as_str).unwrap_or_default();

    match resolver.resolve(city).await {
        Ok(result) => Ok(warp::reply::json(&*result).into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}

/// Anything else under `/api/`
pub async fn api_not_found() -> Result<Response, Infallible> {
    Ok(json_error(StatusCode::NOT_FOUND, "Not found"))
}

/// Attach `RateLimit-*` headers describing the caller's remaining allowance
pub fn with_quota_headers(mut response: Response, quota: Quota) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("ratelimit-limit"),
        HeaderValue::from(quota.limit),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-remaining"),
        HeaderValue::from(quota.remaining),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-reset"),
        HeaderValue::from(airq_weather::throttle::ceil_secs(quota.reset_after)),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_quota_headers() {
        let response = with_quota_headers(
            warp::reply().into_response(),
            Quota {
                limit: 100,
                remaining: 42,
                reset_after: Duration::from_millis(1500),
            },
        );
        let headers = response.headers();
        assert_eq!(headers["ratelimit-limit"], "100");
        assert_eq!(headers["ratelimit-remaining"], "42");
        assert_eq!(headers["ratelimit-reset"], "2");
    }
}
