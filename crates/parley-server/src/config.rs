//! Server configuration.
//!
//! Configuration is loaded from `~/.config/parley/config.toml` (or the path
//! given with `--config`) and then overridden from the environment.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8000"
//!
//! [model]
//! base_url = "http://localhost:12434/engines/v1"
//! model = "ai/qwen3"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_seconds = 60
//!
//! [chat]
//! system_prompt = "You are a helpful assistant with access to web tools."
//! default_thread = "thread-1"
//! enabled_tools = ["tavily-search"]
//! max_tool_iterations = 5
//! max_history = 40
//! params = { temperature = 0.0 }
//!
//! [[tools.servers]]
//! id = "tavily"
//! protocol = "http"
//! url = "http://localhost:8811/mcp"
//! ```
//!
//! ## Environment Overrides
//!
//! | variable | overrides |
//! |---|---|
//! | `LLM_MODEL_URL` | `model.base_url` |
//! | `LLM_MODEL_NAME` | `model.model` |
//! | `LLM_API_KEY` | `model.api_key` |
//! | `PARLEY_LISTEN` | `server.listen` |
//! | `PARLEY_MCP_URL` | adds an HTTP MCP server with id `default` when `[tools]` lists none |

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use parley::GenerateOptions;
use parley_common::Config;
use parley_tools::mcp::{McpConfig, McpServerConfig};

use crate::error::{Result, ServerError};

/// Id given to the MCP server configured through `PARLEY_MCP_URL`.
pub const ENV_MCP_SERVER_ID: &str = "default";

/// Server configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub server: HttpSettings,

    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub chat: ChatSettings,

    /// MCP servers whose tools are registered at startup.
    #[serde(default)]
    pub tools: McpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Address the HTTP server binds to (default: 127.0.0.1:8000)
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8000))
}

/// The completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub model: String,

    /// Inline API key. Prefer `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Name of an environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: Option<u64>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: String::new(),
            api_key: None,
            api_key_env: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
const fn default_timeout_seconds() -> Option<u64> {
    Some(60)
}

impl ModelSettings {
    /// Builds the gateway configuration, resolving the API key.
    ///
    /// An inline `api_key` wins over `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_key_env` names a variable that is not set.
    pub fn client_config(&self) -> Result<Config> {
        let mut config = Config::new(self.base_url.as_str(), self.model.as_str());
        config.timeout_seconds = self.timeout_seconds;

        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.as_str());
        } else if let Some(var) = &self.api_key_env {
            let key = std::env::var(var).map_err(|_| {
                ServerError::Config(format!("API key environment variable '{var}' is not set"))
            })?;
            config = config.with_api_key(key);
        }

        Ok(config)
    }
}

/// Defaults for `/chat` requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Pinned as the first message of every thread.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Thread used when a request names none (default: "thread-1")
    #[serde(default = "default_thread")]
    pub default_thread: String,

    /// Tools offered when a request names none.
    #[serde(default)]
    pub enabled_tools: Vec<String>,

    /// Completion round-trips per request (default: 5)
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,

    /// Threads are truncated to this many messages after each turn.
    #[serde(default)]
    pub max_history: Option<i64>,

    /// Extra model parameters sent with every request.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            default_thread: default_thread(),
            enabled_tools: Vec::new(),
            max_tool_iterations: default_max_tool_iterations(),
            max_history: None,
            params: Map::new(),
        }
    }
}

fn default_thread() -> String {
    "thread-1".to_string()
}

const fn default_max_tool_iterations() -> u32 {
    GenerateOptions::DEFAULT_MAX_TOOL_ITERATIONS
}

impl ParleyConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing file at the default location is not an error; the
    /// environment may supply everything. Environment overrides are
    /// applied before validation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An explicitly given file does not exist
    /// - The file cannot be read or parsed
    /// - An environment override is malformed
    /// - Validation fails
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(ServerError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    info!(
                        "No configuration file at {}, using defaults and environment",
                        path.display()
                    );
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without applying overrides or validating.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("Failed to read config file: {e}")))?;
        let config: Self = toml::from_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ServerError::Config("Failed to determine config directory".to_string()))?
            .join("parley");

        Ok(config_dir.join("config.toml"))
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `PARLEY_LISTEN` is not a socket address.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup("LLM_MODEL_URL") {
            self.model.base_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL_NAME") {
            self.model.model = model;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(listen) = lookup("PARLEY_LISTEN") {
            self.server.listen = listen.parse().map_err(|e| {
                ServerError::Config(format!("Invalid PARLEY_LISTEN '{listen}': {e}"))
            })?;
        }
        if let Some(url) = lookup("PARLEY_MCP_URL")
            && self.tools.servers.is_empty()
        {
            self.tools
                .servers
                .push(McpServerConfig::http(ENV_MCP_SERVER_ID, url));
        }

        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model base URL or name is empty
    /// - The iteration budget is zero
    /// - MCP server ids are empty or duplicated
    pub fn validate(&self) -> Result<()> {
        if self.model.base_url.trim().is_empty() {
            return Err(ServerError::Config(
                "No model base URL configured (set [model] base_url or LLM_MODEL_URL)".to_string(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(ServerError::Config(
                "No model name configured (set [model] model or LLM_MODEL_NAME)".to_string(),
            ));
        }
        if self.chat.max_tool_iterations == 0 {
            return Err(ServerError::Config(
                "chat.max_tool_iterations must be at least 1".to_string(),
            ));
        }
        self.tools
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(())
    }
}
