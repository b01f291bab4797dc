use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use typed_builder::TypedBuilder;

/// Why a `generate` call stopped without a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// The last allowed round-trip asked for tools; they were not run.
    ToolsPending,
    /// Every round-trip ran tools and none produced an answer.
    NoCompletion,
}

impl Exhaustion {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ToolsPending => "Max tool iterations reached before executing requested tools.",
            Self::NoCompletion => "Max tool iterations exhausted without completion.",
        }
    }
}

impl fmt::Display for Exhaustion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The outcome of one `generate` call.
///
/// Serializes untagged: text and exhaustion sentinels as JSON strings,
/// structured answers as the parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Structured(Value),
    Exhausted(Exhaustion),
}

impl Reply {
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    /// The answer as a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text),
            Self::Structured(value) => value,
            Self::Exhausted(reason) => Value::String(reason.message().to_string()),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => write!(f, "{value}"),
            Self::Exhausted(reason) => write!(f, "{reason}"),
        }
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Structured(value) => value.serialize(serializer),
            Self::Exhausted(reason) => serializer.serialize_str(reason.message()),
        }
    }
}

/// Per-call knobs for [`Core::generate`](crate::Core::generate).
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct GenerateOptions {
    /// Registered tools the model may call in this turn.
    #[builder(default, setter(into))]
    pub enabled_tools: Vec<String>,

    /// Upper bound on completion round-trips.
    #[builder(default = GenerateOptions::DEFAULT_MAX_TOOL_ITERATIONS)]
    pub max_tool_iterations: u32,

    /// JSON schema the final answer should follow.
    #[builder(default, setter(strip_option))]
    pub response_schema: Option<Value>,

    /// Extra request body fields such as `temperature`.
    #[builder(default)]
    pub params: Map<String, Value>,
}

impl GenerateOptions {
    pub const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 5;
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
