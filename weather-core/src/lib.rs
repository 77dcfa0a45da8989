//! Core library for the `weather-mcp` server.
//!
//! This crate defines:
//! - Configuration (API key, base URL, request timeout)
//! - The OpenWeather provider and response reshaping
//! - The tool registry and invoker
//! - The MCP server handler wiring tools to the protocol
//!
//! It is used by `weather-mcp`, but can also be embedded in other binaries or services.

pub mod config;
pub mod model;
pub mod provider;
pub mod server;
pub mod tools;

pub use config::Config;
pub use model::{
    CurrentWeatherResult, ForecastParams, ForecastResult, Location, LookupParams, Units,
};
pub use provider::{Endpoint, ProviderError, WeatherProvider, provider_from_config};
pub use server::WeatherServer;
pub use tools::{ToolError, ToolKind, WeatherTools, registry};
