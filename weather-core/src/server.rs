use rmcp::{
    ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
};
use tracing::debug;

use crate::tools::{WeatherTools, registry};

/// MCP front end for [`WeatherTools`].
#[derive(Debug, Clone)]
pub struct WeatherServer {
    tools: WeatherTools,
}

impl WeatherServer {
    pub fn new(tools: WeatherTools) -> Self {
        Self { tools }
    }
}

impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Weather lookups backed by OpenWeather. Pass either `city` or both `lat` and `lon`."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        debug!("listing tools");
        Ok(ListToolsResult::with_all_items(registry()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let args = request.arguments.unwrap_or_default();
        let text = self.tools.call(&request.name, &args).await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
