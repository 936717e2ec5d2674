//! Weather side of raincheck.
//!
//! Resolves free-text locations via LocationIQ, fetches minute-level
//! precipitation from OpenWeatherMap, and turns it into a one-line chart.

pub mod condense;
pub mod geocode;
pub mod provider;
pub mod sparkline;
pub mod types;

pub use condense::condense;
pub use geocode::{Geocoder, LocationIqGeocoder};
pub use provider::{OpenWeatherProvider, WeatherSource};
pub use sparkline::{render, render_hourly};
pub use types::*;
