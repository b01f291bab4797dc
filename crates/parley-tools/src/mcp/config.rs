//! MCP (Model Context Protocol) configuration types.
//!
//! MCP servers expose external tools (web search, filesystems, databases)
//! that are discovered at startup and registered alongside local tools.
//!
//! ## Example TOML Configuration
//!
//! ```toml
//! [settings]
//! max_retries = 3
//!
//! # Web search over streamable HTTP
//! [[servers]]
//! id = "search"
//! protocol = "http"
//! url = "http://localhost:8811/mcp"
//!
//! # Filesystem server via stdio
//! [[servers]]
//! id = "filesystem"
//! protocol = "stdio"
//! command = "npx"
//! args = ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
//! ```
//!
//! [`McpConfig::from_file`] picks the parser (TOML, YAML, or JSON) from the
//! file extension.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for MCP servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfig {
    /// MCP servers to connect to at startup.
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,
    /// Global settings for MCP client behavior.
    #[serde(default)]
    pub settings: McpSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique identifier for this server
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Server connection configuration
    #[serde(flatten)]
    pub transport: McpTransportConfig,
    /// Working directory for the server process (stdio only)
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

impl McpServerConfig {
    /// A streamable-HTTP server at `url`.
    pub fn http(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            transport: McpTransportConfig::Http { url: url.into() },
            working_directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum McpTransportConfig {
    /// Connect via stdio (spawning a process)
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Connect via Server-Sent Events
    Sse { url: String },
    /// Connect via HTTP streaming
    Http { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpSettings {
    /// Extra connection attempts per server after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

const fn default_max_retries() -> usize {
    3
}

impl McpConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file based on extension
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or has an unsupported extension.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            Some("toml") => Self::from_toml_file(path),
            _ => Err(anyhow::anyhow!(
                "Unsupported config file format. Use .yaml, .yml, .json, or .toml"
            )),
        }
    }

    /// Checks for duplicate or empty server ids.
    ///
    /// # Errors
    /// Returns an error naming the offending id.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen_ids = HashSet::new();
        for server in &self.servers {
            if server.id.trim().is_empty() {
                anyhow::bail!("MCP server ID must not be empty");
            }
            if !seen_ids.insert(&server.id) {
                anyhow::bail!("Duplicate server ID found: {}", server.id);
            }
        }
        Ok(())
    }
}
