use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::tools::ToolError;

/// Loosely-typed tool arguments as they arrive from the caller.
pub type Arguments = Map<String, Value>;

pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_FORECAST_LIMIT: u8 = 12;
pub const MAX_FORECAST_LIMIT: u8 = 40;

/// Unit system understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Standard,
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Standard, Units::Metric, Units::Imperial]
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: standard, metric, imperial."
            )),
        }
    }
}

/// Where a lookup points: a free-text city or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    City(String),
    Coordinates { lat: f64, lon: f64 },
}

/// Validated input shared by both tools.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupParams {
    pub location: Location,
    pub units: Units,
    pub lang: String,
}

impl LookupParams {
    /// Validate a raw argument bag.
    ///
    /// A non-empty `city` string wins over coordinates. Otherwise both `lat`
    /// and `lon` must be JSON numbers.
    pub fn from_arguments(args: &Arguments) -> Result<Self, ToolError> {
        let city = args
            .get("city")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let lat = args.get("lat").and_then(Value::as_f64);
        let lon = args.get("lon").and_then(Value::as_f64);

        let location = match (city, lat, lon) {
            (Some(city), _, _) => Location::City(city.to_owned()),
            (None, Some(lat), Some(lon)) => Location::Coordinates { lat, lon },
            _ => {
                return Err(ToolError::InvalidParams(
                    "Provide either `city` or both `lat` and `lon` as numbers".to_string(),
                ));
            }
        };

        let units = match args.get("units").and_then(Value::as_str) {
            None => Units::default(),
            Some(raw) => Units::try_from(raw).unwrap_or_else(|err| {
                warn!(%err, "falling back to default units");
                Units::default()
            }),
        };

        let lang = args
            .get("lang")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANG)
            .to_owned();

        Ok(Self { location, units, lang })
    }

    /// Base provider query: `units`, `lang` and either `q` or `lat`+`lon`.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("units", self.units.as_str().to_owned()),
            ("lang", self.lang.clone()),
        ];

        match &self.location {
            Location::City(city) => query.push(("q", city.clone())),
            Location::Coordinates { lat, lon } => {
                query.push(("lat", lat.to_string()));
                query.push(("lon", lon.to_string()));
            }
        }

        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastParams {
    pub lookup: LookupParams,
    pub limit: u8,
}

impl ForecastParams {
    pub fn from_arguments(args: &Arguments) -> Result<Self, ToolError> {
        let lookup = LookupParams::from_arguments(args)?;
        let limit = clamp_limit(args.get("limit").and_then(Value::as_f64));

        Ok(Self { lookup, limit })
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = self.lookup.query();
        query.push(("cnt", self.limit.to_string()));
        query
    }
}

/// Floor, then clamp into `1..=MAX_FORECAST_LIMIT`. Missing input means the default.
pub fn clamp_limit(raw: Option<f64>) -> u8 {
    match raw {
        Some(v) if v.is_finite() => v.floor().clamp(1.0, f64::from(MAX_FORECAST_LIMIT)) as u8,
        _ => DEFAULT_FORECAST_LIMIT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub timezone_offset_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub description: String,
    pub icon: Option<String>,
}

impl Condition {
    /// Used when the provider sends an empty condition list.
    pub fn unavailable() -> Self {
        Self { description: "N/A".to_string(), icon: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Temperature {
    pub value: f64,
    pub feels_like: f64,
    pub min: f64,
    pub max: f64,
    pub units: Units,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: Option<f64>,
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeatherResult {
    pub location: LocationInfo,
    /// Local wall-clock time at the location, expressed as a `Z` instant.
    #[serde(rename = "observationTimeISO")]
    pub observation_time_iso: String,
    pub weather: Condition,
    pub temperature: Temperature,
    pub humidity: u32,
    pub pressure: u32,
    pub wind: Wind,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastItem {
    #[serde(rename = "timeISO")]
    pub time_iso: String,
    pub weather: Condition,
    pub temperature: Temperature,
    pub humidity: u32,
    pub pressure: u32,
    pub wind: Wind,
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location: LocationInfo,
    pub count: usize,
    pub items: Vec<ForecastItem>,
}
