//! Tool registry and argument helpers.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<ToolResult>;
}

/// Registry of tool handlers.
pub struct McpHandler {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl McpHandler {
    /// Create a new handler registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool handler.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) {
        let tool = handler.definition();
        self.tools.insert(tool.name.clone(), Arc::new(handler));
    }

    /// Get all registered tools.
    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.values().map(|h| h.definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for McpHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// A successful tool result carrying a JSON payload.
pub fn json_result<T: serde::Serialize>(value: &T) -> Result<ToolResult> {
    let text = serde_json::to_string_pretty(value)?;
    Ok(ToolResult {
        content: vec![text_content(text)],
        is_error: false,
    })
}

/// An error tool result carrying the serialized error envelope.
pub fn envelope_result(error: &Error, context: Option<Value>) -> ToolResult {
    let envelope = error.envelope(context);
    let text = serde_json::to_string_pretty(&envelope)
        .unwrap_or_else(|_| format!("{{\"error\": true, \"message\": \"{error}\"}}"));
    ToolResult {
        content: vec![text_content(text)],
        is_error: true,
    }
}

/// Reject tool calls carrying keys outside the declared schema.
pub fn reject_unknown_keys(args: &HashMap<String, Value>, allowed: &[&str]) -> Result<()> {
    for key in args.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(Error::InvalidInput(format!(
                "unknown option '{key}' (expected one of: {})",
                allowed.join(", ")
            )));
        }
    }
    Ok(())
}

/// Extract a required string argument.
pub fn get_string_arg(args: &HashMap<String, Value>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| {
            Error::InvalidToolArguments(format!("Missing required argument: {name}"))
        })
}

/// Extract an optional string argument.
pub fn get_optional_string_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Extract an optional positive integer argument.
pub fn get_optional_usize_arg(
    args: &HashMap<String, Value>,
    name: &str,
) -> Result<Option<usize>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                Error::InvalidInput(format!("'{name}' must be a positive integer"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> Tool {
            Tool::new(
                "echo",
                "Echo the input",
                json!({
                    "type": "object",
                    "properties": { "input": { "type": "string" } }
                }),
            )
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
            let input = get_optional_string_arg(&args, "input").unwrap_or_default();
            json_result(&json!({ "echo": input }))
        }
    }

    #[test]
    fn test_handler_registration() {
        let mut handler = McpHandler::new();
        handler.register(EchoTool);

        assert_eq!(handler.tool_count(), 1);
        assert!(handler.has_tool("echo"));
        assert!(!handler.has_tool("nonexistent"));
    }

    #[tokio::test]
    async fn test_tool_execution() {
        let mut handler = McpHandler::new();
        handler.register(EchoTool);

        let tool = handler.get_tool("echo").unwrap();
        let mut args = HashMap::new();
        args.insert("input".to_string(), json!("hello"));

        let result = tool.execute(args).await.unwrap();
        assert!(!result.is_error);
        let ContentBlock::Text { text } = &result.content[0];
        assert!(text.contains("hello"));
    }

    #[test]
    fn test_get_string_arg() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), json!("value"));

        assert_eq!(get_string_arg(&args, "name").unwrap(), "value");
        assert!(get_string_arg(&args, "missing").is_err());
    }

    #[test]
    fn test_get_optional_usize_arg() {
        let mut args = HashMap::new();
        args.insert("limit".to_string(), json!(10));
        args.insert("bad".to_string(), json!(-3));
        args.insert("zero".to_string(), json!(0));

        assert_eq!(get_optional_usize_arg(&args, "limit").unwrap(), Some(10));
        assert_eq!(get_optional_usize_arg(&args, "missing").unwrap(), None);
        assert!(get_optional_usize_arg(&args, "bad").is_err());
        assert!(get_optional_usize_arg(&args, "zero").is_err());
    }

    #[test]
    fn test_reject_unknown_keys() {
        let mut args = HashMap::new();
        args.insert("identifier".to_string(), json!("Container"));
        assert!(reject_unknown_keys(&args, &["identifier", "topic"]).is_ok());

        args.insert("surprise".to_string(), json!(1));
        let err = reject_unknown_keys(&args, &["identifier", "topic"]).unwrap_err();
        assert_eq!(err.error_type(), "invalid_input");
        assert!(err.to_string().contains("surprise"));
    }

    #[test]
    fn test_envelope_result_marks_error() {
        let result = envelope_result(&Error::NotFound("widgets.Nope".into()), None);
        assert!(result.is_error);
        let ContentBlock::Text { text } = &result.content[0];
        assert!(text.contains("\"error_type\": \"not_found\""));
    }

    #[test]
    fn test_list_tools_sorted() {
        struct Named(&'static str);
        #[async_trait]
        impl ToolHandler for Named {
            fn definition(&self) -> Tool {
                Tool::new(self.0, "", json!({"type": "object"}))
            }
            async fn execute(&self, _: HashMap<String, Value>) -> Result<ToolResult> {
                json_result(&json!({}))
            }
        }

        let mut handler = McpHandler::new();
        handler.register(Named("search"));
        handler.register(Named("docs"));
        handler.register(Named("status"));

        let names: Vec<String> = handler.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["docs", "search", "status"]);
    }
}
