use anyhow::Result;
use rmcp::{
    RoleClient, ServiceExt,
    model::{CallToolRequestParams, CallToolResult, Tool as McpTool},
    service::RunningService,
    transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess},
};
use serde_json::{Map, Value};

use super::config::{McpServerConfig, McpTransportConfig};

/// A live connection to one MCP server, with the tools it listed at connect time.
pub struct McpClientWrapper {
    pub server_config: McpServerConfig,
    service: RunningService<RoleClient, ()>,
    tools: Vec<McpTool>,
}

impl std::fmt::Debug for McpClientWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientWrapper")
            .field("server", &self.server_config.id)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl McpClientWrapper {
    /// Connect to an MCP server and list its tools
    ///
    /// # Errors
    /// Returns an error if the connection or the tool listing fails.
    pub async fn connect(config: McpServerConfig) -> Result<Self> {
        log::info!("Connecting to MCP server '{}'...", config.id);

        let service = match &config.transport {
            McpTransportConfig::Stdio { command, args, env } => {
                let cmd = tokio::process::Command::new(command);
                let cmd = cmd.configure(|c| {
                    c.args(args).envs(env.clone());

                    if let Some(ref cwd) = config.working_directory {
                        c.current_dir(cwd);
                    }
                });

                let transport = TokioChildProcess::new(cmd)?;
                ().serve(transport).await?
            }
            McpTransportConfig::Sse { url } | McpTransportConfig::Http { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.clone());
                ().serve(transport).await?
            }
        };

        if let Some(info) = service.peer_info() {
            log::info!(
                "Connected to MCP server '{}' - {}",
                config.id,
                info.server_info.name
            );
        }

        let tools = service.list_all_tools().await?;
        log::info!("Server '{}' provides {} tools", config.id, tools.len());
        for tool in &tools {
            log::debug!("  - Tool: {}", tool.name);
        }

        Ok(Self {
            server_config: config,
            service,
            tools,
        })
    }

    /// Call a tool on this MCP server
    ///
    /// # Errors
    /// Returns an error if the request fails at the protocol level.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        log::debug!(
            "Calling tool '{}' on server '{}'",
            name,
            self.server_config.id
        );

        let request = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(arguments),
            task: None,
        };

        let result = self.service.peer().call_tool(request).await?;
        Ok(result)
    }

    /// Tools listed by the server at connect time
    #[must_use]
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Shutdown the client
    ///
    /// # Errors
    /// Returns an error if shutdown fails.
    pub async fn shutdown(self) -> Result<()> {
        self.service.cancel().await?;
        Ok(())
    }
}
