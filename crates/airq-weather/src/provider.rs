//! Upstream weather provider.
//!
//! `UpstreamProvider` is the seam the resolver drives; `OpenWeatherClient`
//! is the production implementation backed by the OpenWeather REST APIs.

use crate::geocode::{GeocodeMatch, GEOCODE_LIMIT};
use crate::types::{Coordinate, PollutionRecord, Stage, UpstreamError, WeatherRecord};
use airq_core::{ReqwestErrorExt, UpstreamConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const USER_AGENT: &str = concat!("airq/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 200;

/// The three calls needed to build a result. No retries are expected.
pub trait UpstreamProvider: Send + Sync {
    /// Candidates for a city name. An empty list means "not found".
    fn geocode(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<GeocodeMatch>, UpstreamError>> + Send;

    /// Pollution samples at a coordinate, most recent first. May be empty.
    fn pollution(
        &self,
        coord: Coordinate,
    ) -> impl Future<Output = Result<Vec<PollutionRecord>, UpstreamError>> + Send;

    /// Current weather at a coordinate, `None` when the provider sent nothing.
    fn weather(
        &self,
        coord: Coordinate,
    ) -> impl Future<Output = Result<Option<WeatherRecord>, UpstreamError>> + Send;
}

#[derive(Debug, Deserialize)]
struct PollutionResponse {
    #[serde(default)]
    list: Option<Vec<PollutionRecord>>,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: WeatherMain,
    wind: WeatherWind,
    #[serde(default)]
    weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct WeatherWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

impl WeatherResponse {
    fn into_record(self) -> Result<WeatherRecord, UpstreamError> {
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| UpstreamError::Decode {
                stage: Stage::Weather,
                message: "weather conditions list is empty".to_string(),
            })?;

        Ok(WeatherRecord {
            temp: self.main.temp,
            humidity: self.main.humidity,
            wind: self.wind.speed,
            description,
        })
    }
}

/// OpenWeather API client
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    api_key: String,
    geo_base_url: String,
    data_base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client: Arc::new(client),
            api_key: config.api_key.clone(),
            geo_base_url: config.geo_base_url.trim_end_matches('/').to_string(),
            data_base_url: config.data_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue a GET and return the body of a successful response
    async fn fetch_text(&self, stage: Stage, url: &str) -> Result<String, UpstreamError> {
        let network = |e: reqwest::Error| UpstreamError::Network {
            stage,
            source: e.into_network_error(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(floor_char_boundary(&body, MAX_ERROR_BODY));
            return Err(UpstreamError::Status {
                stage,
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(network)
    }
}

/// Parse a JSON body where an empty body or `null` means "no data".
fn decode_optional<T: DeserializeOwned>(stage: Stage, body: &str) -> Result<Option<T>, UpstreamError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<Option<T>>(body).map_err(|e| UpstreamError::Decode {
        stage,
        message: e.to_string(),
    })
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

impl UpstreamProvider for OpenWeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn geocode(&self, name: &str) -> Result<Vec<GeocodeMatch>, UpstreamError> {
        let url = format!(
            "{}/geo/1.0/direct?q={}&limit={}&appid={}",
            self.geo_base_url,
            urlencoding::encode(name),
            GEOCODE_LIMIT,
            urlencoding::encode(&self.api_key),
        );

        let body = self.fetch_text(Stage::Geocode, &url).await?;
        let matches: Vec<GeocodeMatch> =
            decode_optional(Stage::Geocode, &body)?.unwrap_or_default();

        tracing::debug!("Geocoder returned {} match(es)", matches.len());
        Ok(matches)
    }

    #[instrument(skip(self), level = "debug")]
    async fn pollution(&self, coord: Coordinate) -> Result<Vec<PollutionRecord>, UpstreamError> {
        let url = format!(
            "{}/data/2.5/air_pollution?lat={}&lon={}&appid={}",
            self.data_base_url,
            coord.lat,
            coord.lon,
            urlencoding::encode(&self.api_key),
        );

        let body = self.fetch_text(Stage::Pollution, &url).await?;
        let samples = decode_optional::<PollutionResponse>(Stage::Pollution, &body)?
            .and_then(|r| r.list)
            .unwrap_or_default();

        Ok(samples)
    }

    #[instrument(skip(self), level = "debug")]
    async fn weather(&self, coord: Coordinate) -> Result<Option<WeatherRecord>, UpstreamError> {
        let url = format!(
            "{}/data/2.5/weather?lat={}&lon={}&appid={}&units=metric",
            self.data_base_url,
            coord.lat,
            coord.lon,
            urlencoding::encode(&self.api_key),
        );

        let body = self.fetch_text(Stage::Weather, &url).await?;
        decode_optional::<WeatherResponse>(Stage::Weather, &body)?
            .map(WeatherResponse::into_record)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_optional_null_and_empty() {
        let null: Option<WeatherResponse> = decode_optional(Stage::Weather, "null").unwrap();
        assert!(null.is_none());
        let empty: Option<WeatherResponse> = decode_optional(Stage::Weather, "  ").unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_decode_optional_malformed() {
        let err = decode_optional::<WeatherResponse>(Stage::Weather, "{\"main\": 3}").unwrap_err();
        assert!(matches!(err, UpstreamError::Decode { stage: Stage::Weather, .. }));
    }

    #[test]
    fn test_weather_response_extraction() {
        let json = r#"{
            "weather": [{"id": 804, "main": "Clouds", "description": "cloudy"}],
            "main": {"temp": 15.2, "feels_like": 14.6, "pressure": 1012, "humidity": 70},
            "wind": {"speed": 3.1, "deg": 250},
            "name": "London"
        }"#;
        let response: WeatherResponse = serde_json::from_str(json).unwrap();
        let record = response.into_record().unwrap();
        assert_eq!(
            record,
            WeatherRecord {
                temp: 15.2,
                humidity: 70,
                wind: 3.1,
                description: "cloudy".to_string(),
            }
        );
    }

    #[test]
    fn test_weather_response_without_conditions() {
        let json = r#"{"weather": [], "main": {"temp": 1.0, "humidity": 5}, "wind": {"speed": 0.0}}"#;
        let response: WeatherResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_record().is_err());
    }

    #[test]
    fn test_pollution_response_without_list() {
        let parsed: Option<PollutionResponse> =
            decode_optional(Stage::Pollution, r#"{"coord": {"lat": 1.0, "lon": 2.0}}"#).unwrap();
        assert!(parsed.and_then(|r| r.list).is_none());
    }

    #[test]
    fn test_floor_char_boundary() {
        assert_eq!(floor_char_boundary("short", 200), 5);
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(floor_char_boundary("aéb", 2), 1);
    }

    #[test]
    fn test_client_trims_base_urls() {
        let config = UpstreamConfig {
            api_key: "k".into(),
            geo_base_url: "http://geo.example.com/".into(),
            data_base_url: "http://data.example.com//".into(),
            timeout_secs: 5,
        };
        let client = OpenWeatherClient::new(&config).unwrap();
        assert_eq!(client.geo_base_url, "http://geo.example.com");
        assert_eq!(client.data_base_url, "http://data.example.com");
    }
}
