use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use rmcp::ServiceExt;
use serde_json::{Map, Value};
use tracing::info;
use weather_core::{Config, WeatherServer, WeatherTools, provider_from_config, registry};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-mcp", version, about = "MCP server for current weather and forecasts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the weather tools over MCP on stdio (the default).
    Serve,

    /// Store the OpenWeather API key in the config file.
    Configure,

    /// Print the tool descriptors as JSON.
    Tools,

    /// Invoke a single tool and print its JSON payload.
    Call {
        /// Tool name, e.g. "get_current_weather" or "get_forecast".
        tool: String,

        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Serve) {
            Command::Serve => serve().await,
            Command::Configure => configure(),
            Command::Tools => {
                let json = serde_json::to_string_pretty(&registry())
                    .context("Failed to serialize tool registry")?;
                println!("{json}");
                Ok(())
            }
            Command::Call { tool, args } => call(&tool, &args).await,
        }
    }
}

fn load_tools() -> Result<(Config, WeatherTools)> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    Ok((config, WeatherTools::new(provider)))
}

async fn serve() -> Result<()> {
    let (config, tools) = load_tools()?;
    info!(
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        "starting weather MCP server on stdio"
    );

    let service = WeatherServer::new(tools)
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server on stdio")?;

    let reason = service.waiting().await?;
    info!(?reason, "weather MCP server stopped");
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::from_file(&Config::config_file_path()?)?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(api_key.to_string());
    let path = config.save()?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn call(tool: &str, raw_args: &str) -> Result<()> {
    let args = parse_args(raw_args)?;
    let (_, tools) = load_tools()?;

    match tools.call(tool, &args).await {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(err) => bail!("{}: {err}", err.kind()),
    }
}

fn parse_args(raw: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(raw).context("--args must be a JSON object")
}
