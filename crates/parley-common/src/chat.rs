//! Conversation messages exchanged with a chat-completion endpoint.
//!
//! A [`Message`] is kept in exactly the shape the endpoint speaks, so a stored
//! conversation can be replayed to the model without conversion. Any field the
//! endpoint returns that this crate does not model (vendor extensions such as
//! `refusal` or `audio`) is carried in [`Message::extra`] and written back out
//! unchanged.
//!
//! # Message Roles
//!
//! - **System**: standing instructions, at most one and always first
//! - **User**: input from the person driving the conversation
//! - **Assistant**: model output, possibly carrying tool calls
//! - **Tool**: the result of one executed tool call
//!
//! # Example
//!
//! ```
//! use parley_common::chat::{Message, MessageRole};
//! use parley_common::tools::ToolCall;
//!
//! let call = ToolCall::new("get_weather", r#"{"city":"Lisbon"}"#);
//! let assistant = Message::assistant_tool_calls(vec![call.clone()]);
//! assert_eq!(assistant.role, MessageRole::Assistant);
//!
//! let result = Message::tool("18C and sunny", call.id.clone(), "get_weather").unwrap();
//! assert_eq!(result.tool_call_id.as_deref(), Some(call.id.as_str()));
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use typed_builder::TypedBuilder;

use crate::tools::ToolCall;

/// Role of a message sender.
///
/// Serializes to the lowercase strings used on the wire.
///
/// ```
/// use parley_common::chat::MessageRole;
///
/// let json = serde_json::to_string(&MessageRole::Tool).unwrap();
/// assert_eq!(json, "\"tool\"");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Standing instructions for the model.
    System,
    /// Input from the end user.
    User,
    /// Output from the model.
    Assistant,
    /// Output of an executed tool.
    Tool,
}

impl MessageRole {
    /// Returns the wire name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a conversation.
///
/// Optional fields are omitted from the serialized form when unset, and
/// `tool_calls` is omitted when empty, so the JSON matches what
/// OpenAI-compatible endpoints accept.
///
/// # Builder Pattern
///
/// ```
/// use parley_common::chat::{Message, MessageRole};
///
/// let msg = Message::builder()
///     .role(MessageRole::User)
///     .content("Hello!")
///     .build();
/// assert_eq!(msg.text(), "Hello!");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, TypedBuilder)]
pub struct Message {
    /// Who produced the message.
    pub role: MessageRole,

    /// Text body. Assistant messages that only request tools may have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub content: Option<String>,

    /// Tool invocations requested by an assistant message.
    ///
    /// Uses `SmallVec` since a turn rarely requests more than two tools.
    #[serde(
        default,
        skip_serializing_if = "SmallVec::is_empty",
        deserialize_with = "nullable_tool_calls"
    )]
    #[builder(default)]
    pub tool_calls: SmallVec<[ToolCall; 2]>,

    /// For tool messages, the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub tool_call_id: Option<String>,

    /// For tool messages, the name of the tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub name: Option<String>,

    /// Fields returned by the endpoint that have no dedicated slot above.
    #[serde(flatten)]
    #[builder(default)]
    pub extra: Map<String, Value>,
}

fn nullable_tool_calls<'de, D>(deserializer: D) -> Result<SmallVec<[ToolCall; 2]>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<SmallVec<[ToolCall; 2]>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Message {
    /// Creates a message with the given role and text.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: SmallVec::new(),
            tool_call_id: None,
            name: None,
            extra: Map::new(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates an assistant message that only requests tool calls.
    pub fn assistant_tool_calls(tool_calls: impl Into<SmallVec<[ToolCall; 2]>>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: tool_calls.into(),
            tool_call_id: None,
            name: None,
            extra: Map::new(),
        }
    }

    /// Creates a tool result message.
    ///
    /// The call id is copied from the model's request and may be empty when
    /// the endpoint did not supply one.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is empty.
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            anyhow::bail!("Tool name cannot be empty for tool messages");
        }
        let mut msg = Self::new(MessageRole::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(name);
        Ok(msg)
    }

    /// Returns the text body, or an empty string when there is none.
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Returns `true` when the message requests at least one tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
