//! OpenAI chat-completions wire types and client implementation.
//!
//! This module provides the request/response bodies of the
//! `/chat/completions` endpoint and a client that works with any
//! OpenAI-compatible server (OpenAI itself, vLLM, llama.cpp, Ollama,
//! Docker Model Runner, and so on).

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use parley_common::chat::Message;
use parley_common::client::{ChatRequest, Config, ResponseFormat, Usage};
use parley_common::tools::Tool;

pub mod client;
pub use client::OpenAIClient;

/// Message fields some runtimes attach with the model's hidden reasoning.
/// They are removed before a message is handed back or stored.
pub const REASONING_FIELDS: [&str; 2] = ["reasoning_content", "reasoning"];

/// Request body for a chat completion.
///
/// Serialized as `{model, messages, ...params, tools?, response_format?}`.
/// Extra parameters may override `model` and `messages`; `tools` and
/// `response_format` always win over a parameter of the same name.
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// The full conversation.
    pub messages: &'a [Message],
    /// Tool catalog, omitted when empty.
    pub tools: Option<&'a [Tool]>,
    /// Structured-output constraint.
    pub response_format: Option<&'a ResponseFormat>,
    /// Extra model parameters merged into the top level.
    pub params: &'a Map<String, Value>,
}

impl<'a> From<(&'a ChatRequest, &'a Config)> for ChatCompletionRequest<'a> {
    fn from((request, config): (&'a ChatRequest, &'a Config)) -> Self {
        Self {
            model: request.model.as_deref().unwrap_or(&config.model),
            messages: &request.messages,
            tools: request.tools.as_deref().filter(|tools| !tools.is_empty()),
            response_format: request.response_format.as_ref(),
            params: &request.params,
        }
    }
}

impl Serialize for ChatCompletionRequest<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let overridden = |key: &str| match key {
            "tools" => self.tools.is_some(),
            "response_format" => self.response_format.is_some(),
            _ => false,
        };

        let mut map = serializer.serialize_map(None)?;
        if !self.params.contains_key("model") {
            map.serialize_entry("model", self.model)?;
        }
        if !self.params.contains_key("messages") {
            map.serialize_entry("messages", self.messages)?;
        }
        for (key, value) in self.params {
            if !overridden(key) {
                map.serialize_entry(key, value)?;
            }
        }
        if let Some(tools) = self.tools {
            map.serialize_entry("tools", tools)?;
        }
        if let Some(format) = self.response_format {
            map.serialize_entry("response_format", format)?;
        }
        map.end()
    }
}

/// A single choice from a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The index of this choice in the response array.
    #[serde(default)]
    pub index: u32,
    /// The generated message for this choice.
    pub message: Message,
    /// Why generation stopped for this choice.
    ///
    /// Common values: "stop", "length", "tool_calls", "content_filter"
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response body of a chat completion.
///
/// Only `choices` is required; local runtimes often omit the rest.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    /// Unique identifier for this completion.
    #[serde(default)]
    pub id: String,
    /// Unix timestamp of when the completion was created.
    #[serde(default)]
    pub created: u64,
    /// The model that generated this completion.
    #[serde(default)]
    pub model: String,
    /// Generated completions.
    pub choices: Vec<ChatChoice>,
    /// Token usage statistics (if available).
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Removes vendor reasoning fields from a returned message.
pub fn strip_reasoning(message: &mut Message) {
    for field in REASONING_FIELDS {
        message.extra.remove(field);
    }
}
