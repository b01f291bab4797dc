//! # parley-tools
//!
//! Tool registry and dispatch for the parley conversation loop.
//!
//! ## Core Components
//!
//! - [`ToolImplementation`]: trait every callable tool implements
//! - [`FunctionTool`]: wraps a plain closure (sync or async) as a tool
//! - [`ToolRegistry`]: thread-safe name → tool map, catalog builder, and dispatcher
//! - [`ToolError`]: dispatch failures, rendered as text the model can read
//! - [`mcp`]: discovery of tools served over the Model Context Protocol
//!
//! ## Example
//!
//! ```rust
//! use parley_common::ToolCall;
//! use parley_tools::{FunctionTool, ToolRegistry};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = ToolRegistry::new();
//! registry.register_tool(FunctionTool::sync(
//!     "greet",
//!     "Greet a person by name",
//!     json!({
//!         "type": "object",
//!         "properties": {"name": {"type": "string"}},
//!         "required": ["name"]
//!     }),
//!     |args| {
//!         let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("stranger");
//!         Ok(json!(format!("Hello, {name}!")))
//!     },
//! ));
//!
//! // Definitions to advertise to the model
//! let catalog = registry.catalog(&["greet"]);
//! assert_eq!(catalog.len(), 1);
//!
//! // Dispatch a call the model made
//! let output = registry.execute(&ToolCall::new("greet", r#"{"name":"Ada"}"#)).await?;
//! assert_eq!(output, "Hello, Ada!");
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! The [`ToolRegistry`] uses `DashMap` for concurrent access, so it can be
//! shared between conversations without additional synchronization.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use serde_json::{Map, Value};

use parley_common::tools::{FunctionCall, Tool, ToolCall};

mod error;
mod function;
pub mod mcp;

pub use error::ToolError;
pub use function::FunctionTool;

/// A callable tool the model may invoke.
///
/// `execute` is the single, uniform async contract: a tool that computes its
/// answer immediately simply returns a ready future.
#[async_trait]
pub trait ToolImplementation: Send + Sync {
    /// The definition advertised to the model. Its function name is the
    /// registry key.
    fn get_definition(&self) -> Tool;

    /// Run the tool with parsed keyword arguments.
    ///
    /// # Errors
    ///
    /// Any error is reported back to the model as the tool's output.
    async fn execute(&self, args: &Map<String, Value>) -> Result<Value>;
}

/// Name-keyed collection of tools.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<dyn ToolImplementation>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: Arc::new(DashMap::new()),
        }
    }

    /// Registers a tool under its definition's name, replacing any previous
    /// tool of the same name.
    pub fn register(&self, tool: Arc<dyn ToolImplementation>) {
        let name = tool.get_definition().function.name;
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!("Replaced tool '{name}' in registry");
        } else {
            debug!("Registered tool '{name}'");
        }
    }

    pub fn register_tool<T: ToolImplementation + 'static>(&self, tool: T) {
        self.register(Arc::new(tool));
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolImplementation>> {
        self.tools.get(name).map(|r| r.value().clone())
    }

    /// Definitions for the requested names, in request order.
    ///
    /// Unknown names are skipped and repeated names appear once.
    #[must_use]
    pub fn catalog<S: AsRef<str>>(&self, names: &[S]) -> Vec<Tool> {
        let mut seen = HashSet::new();
        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| seen.insert(*name))
            .filter_map(|name| {
                let tool = self.resolve(name);
                if tool.is_none() {
                    debug!(
                        "Enabled tool '{name}' is not registered; leaving it out of the catalog"
                    );
                }
                tool.map(|t| t.get_definition())
            })
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|t| t.key().clone()).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Executes one tool call and renders its output as text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if the tool is unknown, the arguments are not a
    /// JSON object, or the tool itself fails. The error's `Display` is the
    /// text to hand back to the model.
    pub async fn execute(&self, tool_call: &ToolCall) -> Result<String, ToolError> {
        let Some(name) = tool_call.tool_name() else {
            return Err(ToolError::NotRegistered(ToolError::UNKNOWN_TOOL.to_string()));
        };

        let tool = self
            .resolve(name)
            .ok_or_else(|| ToolError::NotRegistered(name.to_string()))?;

        let args = parse_arguments(&tool_call.function)?;

        debug!("Executing tool '{name}' (call id '{}')", tool_call.id);
        match tool.execute(&args).await {
            Ok(value) => Ok(render_output(value)),
            Err(source) => {
                warn!("Tool '{name}' failed: {source:#}");
                Err(ToolError::Execution {
                    tool: name.to_string(),
                    source,
                })
            }
        }
    }
}

/// Parses a call's raw argument string into keyword arguments.
///
/// An empty string means no arguments.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] if the string is not valid JSON or
/// is valid JSON but not an object.
pub fn parse_arguments(function: &FunctionCall) -> Result<Map<String, Value>, ToolError> {
    let invalid = |detail: String| ToolError::InvalidArguments {
        tool: function.name.clone(),
        detail,
    };

    match serde_json::from_str(function.arguments_json()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(invalid(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(invalid(e.to_string())),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Renders a tool's return value as message text.
///
/// Objects and arrays become compact JSON, strings are used verbatim, and
/// other scalars use their JSON spelling.
#[must_use]
pub fn render_output(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
