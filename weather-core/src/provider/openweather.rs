use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    Config,
    model::{
        Condition, Coordinates, CurrentWeatherResult, ForecastItem, ForecastResult, LocationInfo,
        Temperature, Units, Wind,
    },
};

use super::{Endpoint, ProviderError, WeatherProvider};

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, http: Client) -> Self {
        Self { api_key, base_url, http }
    }

    /// Build a provider with an HTTP client bounded by the configured timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?.to_owned();

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(api_key, config.base_url.clone(), http))
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.path())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(
        &self,
        endpoint: Endpoint,
        query: &[(&'static str, String)],
    ) -> Result<String, ProviderError> {
        let url = self.url(endpoint);
        debug!(%endpoint, %url, ?query, "sending OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url()))?;

        if !status.is_success() {
            return Err(ProviderError::status(status.as_u16(), &body));
        }

        debug!(%endpoint, bytes = body.len(), "OpenWeather response received");
        Ok(body)
    }
}

/// Reshape a current-weather body.
///
/// The observation time is shifted by the location's UTC offset, so the
/// rendered instant reads as local wall-clock time at the queried place.
pub fn map_current(body: &str, units: Units) -> Result<CurrentWeatherResult, ProviderError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;

    let local_ts = parsed
        .dt
        .checked_add(parsed.timezone)
        .ok_or(ProviderError::InvalidTimestamp(parsed.dt))?;
    let observation_time_iso =
        unix_to_iso(local_ts).ok_or(ProviderError::InvalidTimestamp(local_ts))?;

    Ok(CurrentWeatherResult {
        location: LocationInfo {
            name: parsed.name,
            country: parsed.sys.country,
            coordinates: parsed.coord.map(Into::into),
            timezone_offset_seconds: Some(parsed.timezone),
        },
        observation_time_iso,
        weather: first_condition(&parsed.weather),
        temperature: parsed.main.temperature(units),
        humidity: parsed.main.humidity,
        pressure: parsed.main.pressure,
        wind: parsed.wind.into(),
        sunrise: parsed.sys.sunrise.and_then(unix_to_iso),
        sunset: parsed.sys.sunset.and_then(unix_to_iso),
    })
}

/// Reshape a forecast body, keeping at most `limit` entries. Entry times are UTC.
pub fn map_forecast(
    body: &str,
    units: Units,
    limit: usize,
) -> Result<ForecastResult, ProviderError> {
    let parsed: OwForecastResponse = serde_json::from_str(body)?;

    let items = parsed
        .list
        .into_iter()
        .take(limit)
        .map(|entry| {
            let time_iso = unix_to_iso(entry.dt).ok_or(ProviderError::InvalidTimestamp(entry.dt))?;

            Ok(ForecastItem {
                time_iso,
                weather: first_condition(&entry.weather),
                temperature: entry.main.temperature(units),
                humidity: entry.main.humidity,
                pressure: entry.main.pressure,
                wind: entry.wind.into(),
                dt_txt: entry.dt_txt,
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    Ok(ForecastResult {
        location: LocationInfo {
            name: parsed.city.name,
            country: parsed.city.country,
            coordinates: parsed.city.coord.map(Into::into),
            timezone_offset_seconds: parsed.city.timezone,
        },
        count: items.len(),
        items,
    })
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

impl From<OwCoord> for Coordinates {
    fn from(c: OwCoord) -> Self {
        Coordinates { lat: c.lat, lon: c.lon }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: u32,
    humidity: u32,
}

impl OwMain {
    fn temperature(&self, units: Units) -> Temperature {
        Temperature {
            value: self.temp,
            feels_like: self.feels_like,
            min: self.temp_min,
            max: self.temp_max,
            units,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
    gust: Option<f64>,
}

impl From<OwWind> for Wind {
    fn from(w: OwWind) -> Self {
        Wind { speed: w.speed, deg: w.deg, gust: w.gust }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    coord: Option<OwCoord>,
    dt: i64,
    #[serde(default)]
    timezone: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    name: String,
    country: Option<String>,
    coord: Option<OwCoord>,
    timezone: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    dt_txt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

fn first_condition(weather: &[OwWeather]) -> Condition {
    weather
        .first()
        .map(|w| Condition { description: w.description.clone(), icon: w.icon.clone() })
        .unwrap_or_else(Condition::unavailable)
}

/// Epoch seconds to a millisecond-precision `Z` instant.
pub fn unix_to_iso(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
