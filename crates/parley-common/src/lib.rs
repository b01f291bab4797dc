//! # parley-common
//!
//! Shared types for the parley conversation loop.
//!
//! This crate provides the data model every other parley crate speaks:
//! - Conversation messages in the wire shape of OpenAI-compatible endpoints
//! - Tool definitions and the tool calls models make back
//! - Completion requests, responses, and endpoint configuration
//!
//! ## Example
//!
//! ```
//! use parley_common::{ChatRequest, Message, ResponseFormat, Tool};
//! use serde_json::json;
//!
//! let tool = Tool::function(
//!     "get_current_time",
//!     "Get the current date and time in UTC. Takes no parameters.",
//!     json!({"type": "object", "properties": {}}),
//! );
//!
//! let request = ChatRequest::new(vec![
//!     Message::system("You are a helpful assistant."),
//!     Message::user("What time is it?"),
//! ])
//! .with_tools(vec![tool])
//! .with_response_format(ResponseFormat::json_schema(json!({"type": "object"})));
//!
//! assert!(request.has_tools());
//! ```

/// Conversation message types.
pub mod chat;
/// Client configuration and request/response types.
pub mod client;
/// Tool definition and tool call types.
pub mod tools;

pub use chat::{Message, MessageRole};
pub use client::{
    ChatRequest, ChatResponse, Config, FinishReason, JsonSchemaFormat, ResponseFormat, Usage,
};
pub use tools::{Function, FunctionCall, Tool, ToolCall};
