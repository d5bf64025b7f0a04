//! Air quality and weather lookup for airq
//!
//! Resolves a city name to coordinates, pollution and current weather via
//! the OpenWeather APIs, with a short-lived result cache and per-client
//! request throttling.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod resolver;
pub mod throttle;
pub mod types;

pub use cache::ResultCache;
pub use geocode::{normalize_city, GeocodeMatch};
pub use provider::{OpenWeatherClient, UpstreamProvider};
pub use resolver::Resolver;
pub use throttle::{Quota, ThrottleGate};
pub use types::*;
