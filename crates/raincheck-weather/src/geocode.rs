//! Forward geocoding: convert a free-text location phrase to coordinates.
//! Uses LocationIQ (OpenStreetMap data), which requires an API key.

use crate::types::{GeocodeError, Place};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const LOCATIONIQ_URL: &str = "https://us1.locationiq.com";
const USER_AGENT: &str = concat!("raincheck/", env!("CARGO_PKG_VERSION"));

/// Resolves a location phrase to a named place
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Place, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
    address: Option<SearchAddress>,
}

#[derive(Debug, Deserialize)]
struct SearchAddress {
    name: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct LocationIqGeocoder {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LocationIqGeocoder {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: LOCATIONIQ_URL.to_string(),
        })
    }

    /// Point the geocoder at another host (used by tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Geocoder for LocationIqGeocoder {
    async fn geocode(&self, query: &str) -> Result<Place, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
                ("normalizeaddress", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GeocodeError::NotFound(query.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

        let place = to_place(first, query)?;
        tracing::debug!(
            "Geocoded {:?} to {} ({}, {})",
            query,
            place.name,
            place.latitude,
            place.longitude
        );
        Ok(place)
    }
}

fn to_place(result: SearchResult, query: &str) -> Result<Place, GeocodeError> {
    let latitude = result
        .lat
        .parse::<f64>()
        .map_err(|e| GeocodeError::Parse(format!("latitude {:?}: {}", result.lat, e)))?;
    let longitude = result
        .lon
        .parse::<f64>()
        .map_err(|e| GeocodeError::Parse(format!("longitude {:?}: {}", result.lon, e)))?;

    let name = result
        .address
        .and_then(place_name)
        .or(result.display_name)
        .unwrap_or_else(|| query.to_string());

    Ok(Place {
        name,
        latitude,
        longitude,
    })
}

/// Build a short label like "Portland, United States" from address parts.
fn place_name(addr: SearchAddress) -> Option<String> {
    let country = addr.country.clone();

    // Most specific settlement first
    let place = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.suburb)
        .or(addr.name)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)?;

    match country {
        Some(c) if !c.is_empty() && c != place => Some(format!("{}, {}", place, c)),
        _ => Some(place),
    }
}
