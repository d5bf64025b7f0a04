use airq_core::NetworkError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinate resolved by the geocoder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Overall air quality category reported by the provider (1 = best, 5 = worst)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AqiLevel {
    Good = 1,
    Fair = 2,
    Moderate = 3,
    Poor = 4,
    VeryPoor = 5,
}

impl AqiLevel {
    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

impl TryFrom<u8> for AqiLevel {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Self::Good),
            2 => Ok(Self::Fair),
            3 => Ok(Self::Moderate),
            4 => Ok(Self::Poor),
            5 => Ok(Self::VeryPoor),
            other => Err(format!("air quality index {} is outside 1..=5", other)),
        }
    }
}

impl From<AqiLevel> for u8 {
    fn from(level: AqiLevel) -> Self {
        level as u8
    }
}

/// `main` block of a pollution sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiIndex {
    pub aqi: AqiLevel,
}

/// Pollutant concentrations in µg/m³
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub co: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<f64>,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nh3: Option<f64>,
}

/// One air pollution sample, kept in the provider's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutionRecord {
    pub main: AqiIndex,
    pub components: Components,
    /// Sample time, unix seconds
    pub dt: i64,
}

/// Current weather conditions (metric units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub temp: f64,
    pub humidity: i64,
    pub wind: f64,
    pub description: String,
}

/// Merged response for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResult {
    pub coord: Coordinate,
    pub aqi: PollutionRecord,
    pub weather: WeatherRecord,
}

impl UnifiedResult {
    /// Combine the three upstream records into the response shape.
    pub fn assemble(coord: Coordinate, aqi: PollutionRecord, weather: WeatherRecord) -> Self {
        Self { coord, aqi, weather }
    }
}

/// Upstream call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Geocode,
    Pollution,
    Weather,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Geocode => "geocode",
            Stage::Pollution => "pollution",
            Stage::Weather => "weather",
        };
        f.write_str(name)
    }
}

/// Which record was absent from an otherwise successful upstream reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingData {
    Pollution,
    Weather,
}

impl fmt::Display for MissingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingData::Pollution => f.write_str("pollution"),
            MissingData::Weather => f.write_str("weather"),
        }
    }
}

/// Transport-level failures talking to the weather provider
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{stage} request failed: {source}")]
    Network {
        stage: Stage,
        #[source]
        source: NetworkError,
    },
    #[error("{stage} returned status {status}: {body}")]
    Status { stage: Stage, status: u16, body: String },
    #[error("{stage} payload could not be decoded: {message}")]
    Decode { stage: Stage, message: String },
}

impl UpstreamError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Network { stage, .. } | Self::Status { stage, .. } | Self::Decode { stage, .. } => {
                *stage
            }
        }
    }

    /// Whether the provider (rather than the network path) is at fault.
    pub fn is_upstream_fault(&self) -> bool {
        match self {
            Self::Network { source, .. } => source.is_upstream_fault(),
            Self::Status { .. } | Self::Decode { .. } => true,
        }
    }
}

/// Per-request failure taxonomy
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("City parameter is missing or blank")]
    InvalidInput,
    #[error("No geocoding match for {0:?}")]
    CityNotFound(String),
    #[error("Upstream returned no {0} data")]
    UpstreamDataMissing(MissingData),
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] UpstreamError),
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london_sample() -> serde_json::Value {
        serde_json::json!({
            "main": {"aqi": 2},
            "components": {
                "co": 201.94, "no": 0.02, "no2": 0.77, "o3": 68.66,
                "so2": 0.64, "pm2_5": 0.5, "pm10": 0.54, "nh3": 0.12
            },
            "dt": 1605182400
        })
    }

    #[test]
    fn test_aqi_level_range() {
        assert_eq!(AqiLevel::try_from(1), Ok(AqiLevel::Good));
        assert_eq!(AqiLevel::try_from(5), Ok(AqiLevel::VeryPoor));
        assert!(AqiLevel::try_from(0).is_err());
        assert!(AqiLevel::try_from(6).is_err());
    }

    #[test]
    fn test_aqi_level_description() {
        assert_eq!(AqiLevel::Fair.description(), "Fair");
        assert_eq!(AqiLevel::VeryPoor.description(), "Very Poor");
    }

    #[test]
    fn test_pollution_record_deserialization() {
        let record: PollutionRecord = serde_json::from_value(london_sample()).unwrap();
        assert_eq!(record.main.aqi, AqiLevel::Fair);
        assert_eq!(record.components.pm2_5, 0.5);
        assert_eq!(record.components.nh3, Some(0.12));
        assert_eq!(record.dt, 1605182400);
    }

    #[test]
    fn test_pollution_record_rejects_out_of_range_index() {
        let mut sample = london_sample();
        sample["main"]["aqi"] = serde_json::json!(9);
        assert!(serde_json::from_value::<PollutionRecord>(sample).is_err());
    }

    #[test]
    fn test_pollution_record_keeps_provider_shape() {
        let record: PollutionRecord = serde_json::from_value(london_sample()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["main"]["aqi"], 2);
        assert_eq!(json["dt"], 1605182400);
        assert_eq!(json["components"]["so2"], 0.64);
    }

    #[test]
    fn test_optional_components_are_omitted() {
        let mut sample = london_sample();
        let components = sample["components"].as_object_mut().unwrap();
        components.remove("no");
        components.remove("nh3");

        let record: PollutionRecord = serde_json::from_value(sample).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("nh3"));
        assert!(!json.contains("\"no\""));
    }

    #[test]
    fn test_upstream_error_fault_classification() {
        let timeout = UpstreamError::Network {
            stage: Stage::Weather,
            source: NetworkError::Timeout,
        };
        let status = UpstreamError::Status {
            stage: Stage::Geocode,
            status: 401,
            body: "invalid key".into(),
        };
        assert!(!timeout.is_upstream_fault());
        assert!(status.is_upstream_fault());
        assert_eq!(status.stage(), Stage::Geocode);
        assert!(status.to_string().starts_with("geocode returned status 401"));
    }
}
