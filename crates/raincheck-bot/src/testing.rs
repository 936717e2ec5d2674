//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use raincheck_weather::{Forecast, GeocodeError, Geocoder, Place, WeatherError, WeatherSource};
use tokio::time::Instant;

use crate::transport::{ChatTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Public(String),
    /// (recipient, text)
    Private(String, String),
}

/// Records successful sends with the (tokio) time they happened.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Instant, Sent)>>,
    attempts: AtomicUsize,
    fail_first: usize,
}

impl RecordingTransport {
    /// The first `n` send attempts fail
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::default()
        }
    }

    pub fn sent_messages(&self) -> Vec<Sent> {
        self.sent.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn send_times(&self) -> Vec<Instant> {
        self.sent.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn record(&self, sent: Sent) -> Result<(), TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(TransportError::Closed);
        }
        self.sent.lock().push((Instant::now(), sent));
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_public(&self, text: &str) -> Result<(), TransportError> {
        self.record(Sent::Public(text.to_string()))
    }

    async fn send_private(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        self.record(Sent::Private(recipient.to_string(), text.to_string()))
    }
}

/// Geocoder backed by a fixed table; unknown queries are not found.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    places: HashMap<String, Place>,
    queries: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn with_place(mut self, query: &str, name: &str) -> Self {
        self.places.insert(
            query.to_string(),
            Place {
                name: name.to_string(),
                latitude: 52.52,
                longitude: 13.405,
            },
        );
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Place, GeocodeError> {
        self.queries.lock().push(query.to_string());
        self.places
            .get(query)
            .cloned()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))
    }
}

/// Returns the same forecast for every place, or an error when none is set.
#[derive(Debug, Default)]
pub struct FakeWeather {
    forecast: Option<Forecast>,
    calls: AtomicUsize,
}

impl FakeWeather {
    pub fn returning(forecast: Forecast) -> Self {
        Self {
            forecast: Some(forecast),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn forecast(&self, _place: &Place) -> Result<Forecast, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forecast.clone().ok_or_else(|| WeatherError::Api {
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}
