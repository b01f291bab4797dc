//! Tool definitions advertised to the model and the calls it makes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;
use uuid::Uuid;

fn function_type() -> String {
    "function".to_string()
}

/// Describes a function that can be called by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Function {
    /// The name of the function.
    pub name: String,
    /// Human-readable description of what the function does.
    pub description: String,
    /// JSON Schema of the function's parameters.
    pub parameters: Value,
}

/// A tool advertised to the model, wrapping a function definition.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder, PartialEq, Eq)]
pub struct Tool {
    /// The type of tool (defaults to "function").
    #[serde(rename = "type", default = "function_type")]
    #[builder(default = function_type())]
    pub r#type: String,
    /// The function definition.
    pub function: Function,
}

impl Tool {
    /// Creates a function tool from its parts.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            r#type: function_type(),
            function: Function {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Returns the function name this tool is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// The function half of a tool call: which tool, with which arguments.
///
/// Both fields tolerate being absent on the wire. An empty `name` means the
/// model did not say which tool it wanted.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct FunctionCall {
    /// The name of the function being called.
    #[serde(default)]
    pub name: String,
    /// The arguments as a single, unparsed JSON string.
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Returns the arguments as a JSON string slice.
    ///
    /// Returns `"{}"` if the arguments string is empty.
    #[must_use]
    pub fn arguments_json(&self) -> &str {
        if self.arguments.is_empty() {
            "{}"
        } else {
            &self.arguments
        }
    }
}

/// A tool invocation requested by the model.
///
/// Arguments in `function.arguments` are passed through as-is from the
/// endpoint; parsing happens at dispatch time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Identifier the result message must echo back. May be empty.
    #[serde(default)]
    pub id: String,
    /// The type of call, typically "function".
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    /// The function being invoked.
    #[serde(default)]
    pub function: FunctionCall,
}

impl ToolCall {
    /// Creates a new tool call with a generated ID.
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Returns the requested tool name, or `None` when the model omitted it.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        Some(self.function.name.as_str()).filter(|name| !name.is_empty())
    }
}
