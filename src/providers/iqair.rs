//! IQAir city weather and air quality.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::fetcher::Fetcher;
use crate::core::clock::LocalTime;
use crate::core::market::Weather;
use crate::core::snapshot::Stamp;

const CITY: &str = "Tashkent";
const STATE: &str = "Toshkent%20Shahri";
const COUNTRY: &str = "Uzbekistan";

#[derive(Debug, Deserialize)]
struct CityResponse {
    status: String,
    data: Option<CityData>,
}

#[derive(Debug, Deserialize)]
struct CityData {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    weather: Conditions,
    pollution: Pollution,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    tp: f64,
    hu: f64,
    ic: String,
}

#[derive(Debug, Deserialize)]
struct Pollution {
    aqius: i64,
}

pub struct IqAirProvider {
    base_url: String,
    fetcher: Fetcher,
    api_key: String,
}

impl IqAirProvider {
    pub fn new(base_url: &str, fetcher: Fetcher, api_key: String) -> Self {
        IqAirProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
            api_key,
        }
    }

    /// Current conditions for Tashkent; `prev` when fresh or on failure.
    #[instrument(name = "Weather", skip_all, fields(force = force))]
    pub async fn weather(
        &self,
        prev: Option<Weather>,
        now: &LocalTime,
        window: Duration,
        force: bool,
    ) -> Option<Weather> {
        if !force && prev.as_ref().is_some_and(|w| w.stamp.is_fresh(now, window)) {
            debug!("Weather is fresh, skipping");
            return prev;
        }

        let url = format!(
            "{}/v2/city?city={CITY}&state={STATE}&country={COUNTRY}&key={}",
            self.base_url, self.api_key
        );
        let response = match self.fetcher.fetch_json::<CityResponse>(&url).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Weather unavailable, keeping previous");
                return prev;
            }
        };
        let current = match (response.status.as_str(), response.data) {
            ("success", Some(data)) => data.current,
            (status, _) => {
                warn!(status, "Weather API did not succeed, keeping previous");
                return prev;
            }
        };

        info!(aqi = current.pollution.aqius, temp = current.weather.tp, "Updated weather");
        Some(Weather {
            city: CITY.to_string(),
            aqi: current.pollution.aqius,
            temp: current.weather.tp,
            humidity: current.weather.hu,
            icon: current.weather.ic,
            stamp: Stamp::at(now),
        })
    }
}
