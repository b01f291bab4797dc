//! Client configuration and the request/response types exchanged with a
//! completion endpoint.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::Message;
use crate::tools::Tool;

/// Indicates why the model stopped generating tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Copy)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FinishReason {
    /// Generation completed naturally.
    Stop,
    /// Generation was truncated at the token limit.
    Length,
    /// The model requested tool calls.
    ToolCalls,
    /// Output was blocked by the content filter.
    ContentFilter,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
            Self::ToolCalls => write!(f, "tool_calls"),
            Self::ContentFilter => write!(f, "content_filter"),
        }
    }
}

impl FromStr for FinishReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(Self::Stop),
            "length" => Ok(Self::Length),
            "tool_calls" => Ok(Self::ToolCalls),
            "content_filter" => Ok(Self::ContentFilter),
            _ => anyhow::bail!("Unknown finish reason: {s}"),
        }
    }
}

/// Token usage statistics reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total tokens used.
    #[serde(default)]
    pub total_tokens: u32,
}

/// Constrains the model to emit JSON matching a schema.
///
/// Serializes as
/// `{"type": "json_schema", "json_schema": {"schema": ..., "strict": true}}`.
///
/// ```
/// use parley_common::client::ResponseFormat;
/// use serde_json::json;
///
/// let format = ResponseFormat::json_schema(json!({"type": "object"}));
/// assert_eq!(
///     serde_json::to_value(&format).unwrap(),
///     json!({
///         "type": "json_schema",
///         "json_schema": {"schema": {"type": "object"}, "strict": true}
///     })
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Structured output validated against a JSON Schema.
    JsonSchema {
        /// The schema and its enforcement mode.
        json_schema: JsonSchemaFormat,
    },
}

/// Schema payload of [`ResponseFormat::JsonSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSchemaFormat {
    /// The JSON Schema the output must satisfy.
    pub schema: Value,
    /// Whether the endpoint should enforce the schema strictly.
    pub strict: bool,
}

impl ResponseFormat {
    /// Builds a strict JSON-schema response format.
    #[must_use]
    pub const fn json_schema(schema: Value) -> Self {
        Self::JsonSchema {
            json_schema: JsonSchemaFormat {
                schema,
                strict: true,
            },
        }
    }
}

/// A request for a single chat completion.
///
/// ```
/// use parley_common::{ChatRequest, Message};
/// use serde_json::json;
///
/// let request = ChatRequest::new(vec![Message::user("Hello!")])
///     .with_model("qwen3")
///     .with_param("temperature", json!(0.0));
/// assert!(!request.has_tools());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The full conversation to send.
    pub messages: Arc<[Message]>,
    /// Model identifier; falls back to the client's configured model.
    pub model: Option<String>,
    /// Tools the model may call. `None` or empty means none.
    pub tools: Option<Vec<Tool>>,
    /// Structured-output constraint.
    pub response_format: Option<ResponseFormat>,
    /// Extra model parameters merged into the top level of the request body.
    pub params: Map<String, Value>,
}

impl ChatRequest {
    /// Creates a request carrying only the given messages.
    pub fn new(messages: impl Into<Arc<[Message]>>) -> Self {
        Self {
            messages: messages.into(),
            model: None,
            tools: None,
            response_format: None,
            params: Map::new(),
        }
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the tool catalog. An empty catalog clears it.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    /// Sets the structured-output constraint.
    #[must_use]
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    /// Replaces the extra model parameters.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Adds one extra model parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Returns `true` if at least one tool is offered.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|tools| !tools.is_empty())
    }

    /// Checks that the request has something to send.
    ///
    /// # Errors
    ///
    /// Returns an error if the message list is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.messages.is_empty() {
            anyhow::bail!("Chat request must contain at least one message");
        }
        Ok(())
    }
}

/// The first choice of a completion, plus response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated message, with vendor reasoning fields removed.
    pub message: Message,
    /// The model that produced the response.
    pub model: String,
    /// Token usage, if reported.
    pub usage: Option<Usage>,
    /// Why generation stopped, if reported and recognized.
    pub finish_reason: Option<FinishReason>,
    /// When the response was created.
    pub created_at: DateTime<Utc>,
    /// Provider-assigned response id.
    pub response_id: Option<String>,
}

/// Connection settings for a completion endpoint.
///
/// The API key is optional since local OpenAI-compatible runtimes usually do
/// not check one. It is held as a [`SecretString`] and never serialized.
///
/// ```
/// use parley_common::Config;
///
/// let config = Config::new("http://localhost:12434/engines/v1", "ai/qwen3")
///     .with_api_key("sk-local")
///     .with_timeout_seconds(30);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    pub base_url: String,
    /// Default model identifier.
    pub model: String,
    /// Bearer token, if the endpoint needs one.
    #[serde(skip_serializing, default)]
    pub api_key: Option<SecretString>,
    /// Request timeout in seconds. `None` waits indefinitely.
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Creates a configuration for the given endpoint and model.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout_seconds: None,
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or model is empty, or the timeout is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must not be empty");
        }
        if self.model.trim().is_empty() {
            anyhow::bail!("model must not be empty");
        }
        if self.timeout_seconds == Some(0) {
            anyhow::bail!("timeout_seconds must be greater than zero");
        }
        Ok(())
    }
}
