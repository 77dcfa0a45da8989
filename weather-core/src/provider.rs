use crate::{Config, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod openweather;

/// Provider endpoints, distinguished by path under the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CurrentWeather,
    Forecast,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::CurrentWeather => "weather",
            Endpoint::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to weather provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather provider responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected weather provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("weather provider returned an out-of-range timestamp: {0}")]
    InvalidTimestamp(i64),
}

impl ProviderError {
    /// Build a status error, keeping JSON bodies verbatim (compacted) and
    /// truncating anything else.
    pub fn status(status: u16, body: &str) -> Self {
        let body = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(json) => json.to_string(),
            Err(_) => truncate_body(body),
        };

        ProviderError::Status { status, body }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Issue one GET against `endpoint` and return the body of a 2xx response.
    async fn fetch(
        &self,
        endpoint: Endpoint,
        query: &[(&'static str, String)],
    ) -> Result<String, ProviderError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = OpenWeatherProvider::from_config(config)?;
    Ok(Arc::new(provider))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
