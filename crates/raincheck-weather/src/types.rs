use serde::{Deserialize, Serialize};

/// One minute-level precipitation reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix time in seconds
    #[serde(rename = "dt")]
    pub timestamp: i64,
    /// Precipitation in mm
    #[serde(rename = "precipitation")]
    pub precipitation_mm: f64,
}

impl Sample {
    pub fn new(timestamp: i64, precipitation_mm: f64) -> Self {
        Self {
            timestamp,
            precipitation_mm,
        }
    }
}

/// A geocoded place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Label used in replies, e.g. "Berlin, Germany"
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Short-range precipitation forecast for a place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    /// Minute-level samples for the next hour, oldest first. Empty when the
    /// provider has no minute data for the location.
    pub minutely: Vec<Sample>,
    /// Rain expected in the first hourly bucket, if hourly data exists
    pub hourly_rain_1h: Option<f64>,
}

/// Geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Empty location query")]
    EmptyQuery,
    #[error("Location not found: {0}")]
    NotFound(String),
    #[error("Geocoding API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
