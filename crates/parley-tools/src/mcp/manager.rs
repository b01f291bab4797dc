use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::adapter::McpToolAdapter;
use super::client::McpClientWrapper;
use super::config::{McpConfig, McpServerConfig};
use crate::{ToolImplementation, ToolRegistry};

/// Manages the connections to every configured MCP server.
#[derive(Debug)]
pub struct McpManager {
    clients: BTreeMap<String, Arc<McpClientWrapper>>,
}

impl McpManager {
    /// Create a new MCP manager from a config file
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or no server connects.
    pub async fn from_config_file(path: &Path) -> Result<Self> {
        let config = McpConfig::from_file(path)?;
        Self::new(&config).await
    }

    /// Connect to every configured server.
    ///
    /// Servers that still fail after the configured retries are skipped.
    ///
    /// # Errors
    /// Returns an error if servers are configured but none can be connected.
    pub async fn new(config: &McpConfig) -> Result<Self> {
        config.validate()?;

        let mut clients = BTreeMap::new();
        for server_config in &config.servers {
            match connect_with_retries(server_config, config.settings.max_retries).await {
                Some(client) => {
                    log::info!(
                        "Successfully connected to '{}' with {} tools available",
                        server_config.id,
                        client.tools().len()
                    );
                    clients.insert(server_config.id.clone(), Arc::new(client));
                }
                None => log::error!("Giving up on MCP server '{}'", server_config.id),
            }
        }

        if !config.servers.is_empty() && clients.is_empty() {
            return Err(anyhow::anyhow!("Failed to connect to any MCP servers"));
        }

        Ok(Self { clients })
    }

    /// Ids of the connected servers.
    #[must_use]
    pub fn connected_servers(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    /// One adapter per tool across all connected servers.
    #[must_use]
    pub fn tools(&self) -> Vec<Arc<dyn ToolImplementation>> {
        let mut tools: Vec<Arc<dyn ToolImplementation>> = Vec::new();

        for (server_id, client) in &self.clients {
            for mcp_tool in client.tools() {
                let adapter =
                    McpToolAdapter::new(server_id.clone(), client.clone(), mcp_tool.clone());
                tools.push(Arc::new(adapter));
            }
        }

        tools
    }

    /// Registers every discovered tool, returning how many were added.
    ///
    /// Tools sharing a name across servers overwrite each other in server-id order.
    pub fn register_all(&self, registry: &ToolRegistry) -> usize {
        let tools = self.tools();
        let count = tools.len();
        for tool in tools {
            registry.register(tool);
        }
        count
    }

    /// Shutdown all connections
    ///
    /// Connections still referenced by registered tools close when the last
    /// reference is dropped.
    ///
    /// # Errors
    /// Returns an error if shutting down a client fails.
    pub async fn shutdown(self) -> Result<()> {
        for (server_id, client) in self.clients {
            log::info!("Shutting down connection to '{server_id}'");
            match Arc::try_unwrap(client) {
                Ok(client) => client.shutdown().await?,
                Err(_) => {
                    log::debug!("Connection to '{server_id}' still in use by registered tools");
                }
            }
        }
        Ok(())
    }
}

async fn connect_with_retries(
    server_config: &McpServerConfig,
    max_retries: usize,
) -> Option<McpClientWrapper> {
    match McpClientWrapper::connect(server_config.clone()).await {
        Ok(client) => return Some(client),
        Err(e) => log::error!(
            "Failed to connect to MCP server '{}': {e:#}",
            server_config.id
        ),
    }

    for attempt in 1..=max_retries {
        log::info!(
            "Retrying connection to '{}' (attempt {attempt}/{max_retries})",
            server_config.id
        );
        tokio::time::sleep(Duration::from_secs(1)).await;

        match McpClientWrapper::connect(server_config.clone()).await {
            Ok(client) => return Some(client),
            Err(e) => log::warn!("Retry to '{}' failed: {e:#}", server_config.id),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::mcp::{McpSettings, McpTransportConfig};

    #[tokio::test]
    async fn test_no_servers_is_empty_manager() {
        let manager = McpManager::new(&McpConfig::default()).await.unwrap();
        assert!(manager.connected_servers().is_empty());
        assert!(manager.tools().is_empty());

        let registry = ToolRegistry::new();
        assert_eq!(manager.register_all(&registry), 0);
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_all_servers_failing_is_error() {
        let config = McpConfig {
            servers: vec![McpServerConfig {
                id: "broken".to_string(),
                name: None,
                transport: McpTransportConfig::Stdio {
                    command: "/nonexistent/parley-mcp-server".to_string(),
                    args: Vec::new(),
                    env: std::collections::HashMap::new(),
                },
                working_directory: None,
            }],
            settings: McpSettings { max_retries: 0 },
        };

        let err = McpManager::new(&config).await.unwrap_err();
        assert!(err.to_string().contains("Failed to connect to any MCP servers"));
    }
}
