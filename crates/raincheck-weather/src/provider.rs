//! OpenWeatherMap One Call client.

use crate::types::{Forecast, Place, Sample, WeatherError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const OPENWEATHER_URL: &str = "https://api.openweathermap.org";

/// Fetches a short-range precipitation forecast for a place
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn forecast(&self, place: &Place) -> Result<Forecast, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    #[serde(default)]
    minutely: Vec<Sample>,
    #[serde(default)]
    hourly: Vec<HourlyEntry>,
}

#[derive(Debug, Deserialize)]
struct HourlyEntry {
    rain: Option<RainVolume>,
}

#[derive(Debug, Deserialize)]
struct RainVolume {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<OneCallResponse> for Forecast {
    fn from(resp: OneCallResponse) -> Self {
        // A dry first hour has no "rain" object at all
        let hourly_rain_1h = resp
            .hourly
            .first()
            .map(|h| h.rain.as_ref().map_or(0.0, |r| r.one_hour));

        Forecast {
            minutely: resp.minutely,
            hourly_rain_1h,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            api_key: api_key.to_string(),
            base_url: OPENWEATHER_URL.to_string(),
        })
    }

    /// Point the provider at another host (used by tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    async fn forecast(&self, place: &Place) -> Result<Forecast, WeatherError> {
        let url = format!("{}/data/2.5/onecall", self.base_url);
        let lat = format!("{:.10}", place.latitude);
        let lon = format!("{:.10}", place.longitude);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("exclude", "daily"),
                ("appid", self.api_key.as_str()),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OneCallResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))?;

        let forecast = Forecast::from(body);
        tracing::debug!(
            "Forecast for {}: {} minute samples, first hour rain {:?}",
            place.name,
            forecast.minutely.len(),
            forecast.hourly_rain_1h
        );
        Ok(forecast)
    }
}
