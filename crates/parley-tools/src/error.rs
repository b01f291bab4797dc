//! Tool dispatch errors.
//!
//! These never abort a conversation. The loop records each one's `Display`
//! text as the tool's result so the model can react to it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not in the registry.
    #[error("Error: Requested tool '{0}' is not registered.")]
    NotRegistered(String),

    /// The call's arguments were not a JSON object.
    #[error("Error: invalid JSON for tool '{tool}': {detail}")]
    InvalidArguments { tool: String, detail: String },

    /// The tool ran and failed.
    #[error("Error executing tool '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    /// Name used when the model omitted the tool name.
    pub const UNKNOWN_TOOL: &'static str = "unknown";

    /// The tool name the failed call referred to.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::NotRegistered(tool)
            | Self::InvalidArguments { tool, .. }
            | Self::Execution { tool, .. } => tool,
        }
    }
}
