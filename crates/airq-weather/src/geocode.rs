//! Forward geocoding: convert a free-text city name to coordinates.
//! Uses the OpenWeather direct geocoding API.

use crate::types::Coordinate;
use serde::{Deserialize, Serialize};

/// Maximum number of candidates requested from the geocoder
pub const GEOCODE_LIMIT: u32 = 1;

/// One candidate returned by the geocoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeMatch {
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl GeocodeMatch {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// Place label for logs, e.g. "London, England, GB"
    pub fn label(&self) -> String {
        [self.name.as_deref(), self.state.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Trim and lowercase a city query for use as a cache key.
///
/// Returns `None` when nothing is left after trimming.
pub fn normalize_city(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_city() {
        assert_eq!(normalize_city("  London "), Some("london".to_string()));
        assert_eq!(normalize_city("SÃO PAULO"), Some("são paulo".to_string()));
    }

    #[test]
    fn test_normalize_blank_city() {
        assert_eq!(normalize_city(""), None);
        assert_eq!(normalize_city("   "), None);
        assert_eq!(normalize_city("\t\n"), None);
    }

    #[test]
    fn test_match_deserialization_ignores_extra_fields() {
        let json = serde_json::json!({
            "name": "London",
            "local_names": {"en": "London", "fr": "Londres"},
            "lat": 51.5073219,
            "lon": -0.1276474,
            "country": "GB",
            "state": "England"
        });
        let m: GeocodeMatch = serde_json::from_value(json).unwrap();
        assert_eq!(m.coordinate(), Coordinate { lat: 51.5073219, lon: -0.1276474 });
        assert_eq!(m.label(), "London, England, GB");
    }

    #[test]
    fn test_label_without_state() {
        let m = GeocodeMatch {
            name: Some("Paris".into()),
            lat: 48.85,
            lon: 2.35,
            country: Some("FR".into()),
            state: None,
        };
        assert_eq!(m.label(), "Paris, FR");
    }
}
