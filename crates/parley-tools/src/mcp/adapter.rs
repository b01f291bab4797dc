use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool as McpTool};
use serde_json::{Map, Value, json};

use crate::ToolImplementation;
use parley_common::Tool;

use super::client::McpClientWrapper;

/// Exposes one remote MCP tool as a local [`ToolImplementation`].
///
/// The tool keeps its server-side name, so enabling it in a conversation uses
/// the same name the MCP server advertises.
pub struct McpToolAdapter {
    pub server_id: String,
    client: Arc<McpClientWrapper>,
    mcp_tool: McpTool,
}

impl McpToolAdapter {
    #[must_use]
    pub fn new(server_id: String, client: Arc<McpClientWrapper>, mcp_tool: McpTool) -> Self {
        Self {
            server_id,
            client,
            mcp_tool,
        }
    }

    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.mcp_tool.name
    }
}

/// Converts an MCP tool listing into a function definition.
///
/// A missing description becomes empty and a missing or empty input schema
/// becomes an object schema with no properties.
#[must_use]
pub fn definition_from_mcp(tool: &McpTool) -> Tool {
    let parameters = if tool.input_schema.is_empty() {
        json!({"type": "object", "properties": {}})
    } else {
        Value::Object(tool.input_schema.as_ref().clone())
    };

    Tool::function(
        tool.name.to_string(),
        tool.description.as_deref().unwrap_or_default(),
        parameters,
    )
}

/// Turns a tool-call result into the tool's return value.
///
/// # Errors
/// Fails with the first text content (or "Tool error") when the server flags
/// the result as an error.
pub fn value_from_result(result: CallToolResult) -> Result<Value> {
    let first_text = || {
        result
            .content
            .iter()
            .find_map(|content| content.as_text().map(|text| text.text.clone()))
    };

    if result.is_error.unwrap_or(false) {
        let message = first_text().unwrap_or_else(|| "Tool error".to_string());
        return Err(anyhow::anyhow!(message));
    }

    if let Some(structured) = result.structured_content.clone() {
        return Ok(structured);
    }

    Ok(first_text().map_or(Value::Null, Value::String))
}

#[async_trait]
impl ToolImplementation for McpToolAdapter {
    fn get_definition(&self) -> Tool {
        definition_from_mcp(&self.mcp_tool)
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value> {
        log::info!(
            "Executing MCP tool '{}' on server '{}'",
            self.tool_name(),
            self.server_id
        );
        log::debug!("MCP tool arguments: {}", Value::Object(args.clone()));

        let result = self.client.call_tool(self.tool_name(), args.clone()).await?;
        value_from_result(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn mcp_tool(value: Value) -> McpTool {
        serde_json::from_value(value).unwrap()
    }

    fn call_result(value: Value) -> CallToolResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_definition_keeps_schema_and_description() {
        let tool = mcp_tool(json!({
            "name": "tavily-search",
            "description": "Search the web",
            "inputSchema": {
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }
        }));

        let definition = definition_from_mcp(&tool);
        assert_eq!(definition.function.name, "tavily-search");
        assert_eq!(definition.function.description, "Search the web");
        assert_eq!(definition.function.parameters["required"], json!(["query"]));
    }

    #[test]
    fn test_definition_defaults() {
        let tool = mcp_tool(json!({"name": "ping", "inputSchema": {}}));

        let definition = definition_from_mcp(&tool);
        assert_eq!(definition.function.description, "");
        assert_eq!(
            definition.function.parameters,
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_error_result_uses_first_text() {
        let result = call_result(json!({
            "content": [{"type": "text", "text": "quota exceeded"}],
            "isError": true
        }));
        let err = value_from_result(result).unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn test_error_result_without_text() {
        let result = CallToolResult {
            content: vec![],
            structured_content: None,
            is_error: Some(true),
            meta: None,
        };
        assert_eq!(value_from_result(result).unwrap_err().to_string(), "Tool error");
    }

    #[test]
    fn test_structured_content_wins() {
        let result = call_result(json!({
            "content": [{"type": "text", "text": "{\"hits\":1}"}],
            "structuredContent": {"hits": 1}
        }));
        assert_eq!(value_from_result(result).unwrap(), json!({"hits": 1}));
    }

    #[test]
    fn test_text_result() {
        let result = call_result(json!({"content": [{"type": "text", "text": "42 results"}]}));
        assert_eq!(value_from_result(result).unwrap(), json!("42 results"));
    }

    #[test]
    fn test_empty_result_is_null() {
        let result = CallToolResult {
            content: vec![],
            structured_content: None,
            is_error: None,
            meta: None,
        };
        assert_eq!(value_from_result(result).unwrap(), Value::Null);
    }
}
