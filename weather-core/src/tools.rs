//! Tool registry and invoker.
//!
//! The set of tools is closed: [`ToolKind`] enumerates them and
//! [`WeatherTools::call`] dispatches with an exhaustive match.

use rmcp::model::{ErrorCode, ErrorData, JsonObject, Tool};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    model::{
        Arguments, CurrentWeatherResult, DEFAULT_FORECAST_LIMIT, DEFAULT_LANG, ForecastParams,
        ForecastResult, LookupParams, MAX_FORECAST_LIMIT, Units,
    },
    provider::{
        Endpoint, ProviderError, WeatherProvider,
        openweather::{map_current, map_forecast},
    },
};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool '{0}'. Supported tools: get_current_weather, get_forecast.")]
    MethodNotFound(String),

    #[error("Weather lookup failed: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidParams(_) => "InvalidParams",
            ToolError::MethodNotFound(_) => "MethodNotFound",
            ToolError::Internal(_) => "InternalError",
        }
    }
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        ToolError::Internal(err.to_string())
    }
}

impl From<ToolError> for ErrorData {
    fn from(err: ToolError) -> Self {
        let message = err.to_string();
        match err {
            ToolError::InvalidParams(_) => ErrorData::invalid_params(message, None),
            ToolError::MethodNotFound(_) => {
                ErrorData::new(ErrorCode::METHOD_NOT_FOUND, message, None)
            }
            ToolError::Internal(_) => ErrorData::internal_error(message, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CurrentWeather,
    Forecast,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::CurrentWeather => "get_current_weather",
            ToolKind::Forecast => "get_forecast",
        }
    }

    pub const fn all() -> &'static [ToolKind] {
        &[ToolKind::CurrentWeather, ToolKind::Forecast]
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::CurrentWeather => {
                "Get current weather for a city or a lat/lon pair. \
                 The observation time is reported as local time at the location."
            }
            ToolKind::Forecast => {
                "Get a 3-hourly weather forecast for a city or a lat/lon pair, \
                 up to 40 steps. Item times are UTC."
            }
        }
    }

    /// JSON Schema for the tool's arguments.
    pub fn input_schema(&self) -> JsonObject {
        let units: Vec<&str> = Units::all().iter().map(Units::as_str).collect();

        let mut properties = json!({
            "city": {
                "type": "string",
                "description": "City name, optionally with a country code, e.g. \"London,GB\""
            },
            "lat": {
                "type": "number",
                "description": "Latitude; only used together with lon"
            },
            "lon": {
                "type": "number",
                "description": "Longitude; only used together with lat"
            },
            "units": {
                "type": "string",
                "enum": units,
                "default": Units::default().as_str()
            },
            "lang": {
                "type": "string",
                "description": "Provider language code for condition descriptions",
                "default": DEFAULT_LANG
            }
        });

        if let ToolKind::Forecast = self {
            properties["limit"] = json!({
                "type": "integer",
                "description": "Number of forecast steps; clamped to 1..=40",
                "minimum": 1,
                "maximum": MAX_FORECAST_LIMIT,
                "default": DEFAULT_FORECAST_LIMIT
            });
        }

        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), Value::from("object"));
        schema.insert("properties".to_string(), properties);
        schema
    }

    pub fn tool(&self) -> Tool {
        Tool::new(self.as_str(), self.description(), self.input_schema())
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ToolKind {
    type Error = ToolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ToolKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ToolError::MethodNotFound(value.to_string()))
    }
}

/// Static tool descriptors returned on discovery.
pub fn registry() -> Vec<Tool> {
    ToolKind::all().iter().map(ToolKind::tool).collect()
}

/// Executes tools against a weather provider.
#[derive(Debug, Clone)]
pub struct WeatherTools {
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherTools {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Run the named tool and return its payload as pretty JSON text.
    pub async fn call(&self, name: &str, args: &Arguments) -> Result<String, ToolError> {
        let kind = ToolKind::try_from(name)?;
        info!(tool = %kind, "invoking tool");

        let result = self.dispatch(kind, args).await;
        if let Err(err) = &result {
            warn!(tool = %kind, error_kind = err.kind(), %err, "tool call failed");
        }
        result
    }

    async fn dispatch(&self, kind: ToolKind, args: &Arguments) -> Result<String, ToolError> {
        match kind {
            ToolKind::CurrentWeather => {
                let params = LookupParams::from_arguments(args)?;
                to_text(&self.current_weather(&params).await?)
            }
            ToolKind::Forecast => {
                let params = ForecastParams::from_arguments(args)?;
                to_text(&self.forecast(&params).await?)
            }
        }
    }

    pub async fn current_weather(
        &self,
        params: &LookupParams,
    ) -> Result<CurrentWeatherResult, ToolError> {
        let body = self.provider.fetch(Endpoint::CurrentWeather, &params.query()).await?;
        Ok(map_current(&body, params.units)?)
    }

    pub async fn forecast(&self, params: &ForecastParams) -> Result<ForecastResult, ToolError> {
        let body = self.provider.fetch(Endpoint::Forecast, &params.query()).await?;
        Ok(map_forecast(&body, params.lookup.units, usize::from(params.limit))?)
    }
}

fn to_text<T: Serialize>(payload: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(payload).map_err(|e| ToolError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Query = Vec<(&'static str, String)>;

    #[derive(Debug)]
    enum Reply {
        Body(String),
        Status(u16, String),
    }

    #[derive(Debug)]
    struct FakeProvider {
        reply: Reply,
        calls: Mutex<Vec<(Endpoint, Query)>>,
    }

    impl FakeProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, calls: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<(Endpoint, Query)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch(
            &self,
            endpoint: Endpoint,
            query: &[(&'static str, String)],
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push((endpoint, query.to_vec()));
            match &self.reply {
                Reply::Body(body) => Ok(body.clone()),
                Reply::Status(status, body) => Err(ProviderError::status(*status, body)),
            }
        }
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    fn current_body() -> String {
        json!({
            "coord": { "lon": -0.13, "lat": 51.51 },
            "weather": [],
            "main": {
                "temp": 12.0, "feels_like": 11.0, "temp_min": 10.0, "temp_max": 13.0,
                "pressure": 1015, "humidity": 60
            },
            "wind": { "speed": 5.0 },
            "dt": 1000,
            "sys": { "country": "GB" },
            "timezone": 3600,
            "name": "London"
        })
        .to_string()
    }

    fn forecast_body(entries: usize) -> String {
        let list: Vec<_> = (0..entries)
            .map(|i| {
                json!({
                    "dt": i as i64 * 10_800,
                    "main": {
                        "temp": 1.0, "feels_like": 1.0, "temp_min": 1.0, "temp_max": 1.0,
                        "pressure": 1000, "humidity": 50
                    },
                    "weather": [{ "description": "snow", "icon": "13d" }],
                    "wind": { "speed": 1.0 }
                })
            })
            .collect();
        json!({ "list": list, "city": { "name": "London", "country": "GB" } }).to_string()
    }

    fn tools(provider: &Arc<FakeProvider>) -> WeatherTools {
        WeatherTools::new(provider.clone())
    }

    #[test]
    fn tool_kind_as_str_roundtrip() {
        for kind in ToolKind::all() {
            let parsed = ToolKind::try_from(kind.as_str()).expect("roundtrip should succeed");
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn registry_declares_both_tools() {
        let tools = registry();
        let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, ["get_current_weather", "get_forecast"]);

        let current = &tools[0].input_schema;
        assert!(current["properties"].get("limit").is_none());
        assert_eq!(current["properties"]["units"]["default"], "metric");
        assert_eq!(
            current["properties"]["units"]["enum"],
            json!(["standard", "metric", "imperial"])
        );

        let forecast = &tools[1].input_schema;
        assert_eq!(forecast["properties"]["limit"]["default"], 12);
        assert_eq!(forecast["properties"]["limit"]["maximum"], 40);
        assert_eq!(forecast["properties"]["lang"]["default"], "en");
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found_without_outbound_call() {
        let provider = FakeProvider::new(Reply::Body(current_body()));

        let err = tools(&provider)
            .call("get_air_quality", &args(json!({ "city": "London" })))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::MethodNotFound(ref name) if name == "get_air_quality"));
        assert_eq!(err.kind(), "MethodNotFound");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_location_is_invalid_params_without_outbound_call() {
        let provider = FakeProvider::new(Reply::Body(forecast_body(1)));

        let err = tools(&provider)
            .call("get_forecast", &args(json!({ "lat": 1.0, "limit": 5 })))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidParams(_)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn current_weather_hits_weather_endpoint_with_city() {
        let provider = FakeProvider::new(Reply::Body(current_body()));

        let text = tools(&provider)
            .call("get_current_weather", &args(json!({ "city": "London,GB" })))
            .await
            .unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        let (endpoint, query) = &calls[0];
        assert_eq!(*endpoint, Endpoint::CurrentWeather);
        assert!(query.contains(&("q", "London,GB".to_string())));
        assert!(query.iter().all(|(k, _)| *k != "lat" && *k != "lon" && *k != "cnt"));

        let payload: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload["observationTimeISO"], "1970-01-01T01:16:40.000Z");
        assert_eq!(payload["weather"]["description"], "N/A");
        assert!(payload["weather"]["icon"].is_null());
        assert_eq!(payload["location"]["name"], "London");
        assert!(text.contains('\n'), "payload should be pretty-printed");
    }

    #[tokio::test]
    async fn forecast_sends_clamped_cnt_and_truncates() {
        let provider = FakeProvider::new(Reply::Body(forecast_body(10)));

        let text = tools(&provider)
            .call("get_forecast", &args(json!({ "lat": 51.5, "lon": -0.1, "limit": 3.7 })))
            .await
            .unwrap();

        let (endpoint, query) = &provider.calls()[0];
        assert_eq!(*endpoint, Endpoint::Forecast);
        assert!(query.contains(&("cnt", "3".to_string())));
        assert!(query.contains(&("lat", "51.5".to_string())));
        assert!(query.iter().all(|(k, _)| *k != "q"));

        let payload: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload["count"], 3);
        assert_eq!(payload["items"].as_array().unwrap().len(), 3);
        assert_eq!(payload["items"][0]["weather"]["icon"], "13d");
        assert!(payload["items"][0]["dtTxt"].is_null());
    }

    #[tokio::test]
    async fn provider_status_error_becomes_single_internal_error() {
        let provider = FakeProvider::new(Reply::Status(
            404,
            r#"{"cod":"404","message":"city not found"}"#.to_string(),
        ));

        let err = tools(&provider)
            .call("get_current_weather", &args(json!({ "city": "Atlantis" })))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "InternalError");
        assert!(err.to_string().contains("city not found"));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_internal_error() {
        let provider = FakeProvider::new(Reply::Body("<html>oops</html>".to_string()));

        let err = tools(&provider)
            .call("get_forecast", &args(json!({ "city": "London" })))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Internal(_)));
    }

    #[test]
    fn tool_errors_map_to_protocol_codes() {
        let invalid: ErrorData = ToolError::InvalidParams("x".into()).into();
        assert_eq!(invalid.code, ErrorCode::INVALID_PARAMS);

        let missing: ErrorData = ToolError::MethodNotFound("x".into()).into();
        assert_eq!(missing.code, ErrorCode::METHOD_NOT_FOUND);

        let internal: ErrorData = ToolError::Internal("boom".into()).into();
        assert_eq!(internal.code, ErrorCode::INTERNAL_ERROR);
        assert!(internal.message.contains("boom"));
    }
}
