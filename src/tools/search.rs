//! The `search` tool and its legacy alias.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::handler::{
    envelope_result, get_optional_usize_arg, get_string_arg, json_result, reject_unknown_keys,
    ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::search::DEFAULT_LIMIT;
use crate::service::DocsService;

async fn run_search(service: &DocsService, query: &str, limit: usize) -> Result<ToolResult> {
    match service.search(query, limit).await {
        Ok(response) => json_result(&response),
        Err(e) => Ok(envelope_result(
            &e,
            Some(serde_json::json!({ "query": query })),
        )),
    }
}

/// Unified search across Flutter, Dart, pub.dev and concepts.
pub struct SearchTool {
    service: DocsService,
}

impl SearchTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "search",
            "Search Flutter/Dart documentation, pub.dev packages and Flutter concepts. \
             Returns ranked results whose ids can be passed to the 'docs' tool.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (e.g. 'state management', 'ListView', 'http requests')"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 30,
                        "description": "Maximum number of results (default 10)"
                    }
                },
                "required": ["query"]
            }),
        )
        .with_annotations(ToolAnnotations::read_only_open_world().with_title("Search Documentation"))
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &["query", "limit"])?;

        let query = get_string_arg(&args, "query")?;
        let limit = get_optional_usize_arg(&args, "limit")?.unwrap_or(DEFAULT_LIMIT);

        run_search(&self.service, &query, limit).await
    }
}

/// Legacy alias: `search_flutter_docs(query)`.
pub struct SearchFlutterDocsTool {
    service: DocsService,
}

impl SearchFlutterDocsTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for SearchFlutterDocsTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "search_flutter_docs",
            "Search Flutter/Dart documentation (legacy alias of 'search').",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    }
                },
                "required": ["query"]
            }),
        )
        .with_annotations(ToolAnnotations::read_only_open_world())
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &["query"])?;
        let query = get_string_arg(&args, "query")?;
        run_search(&self.service, &query, DEFAULT_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mcp::protocol::ContentBlock;
    use crate::resolver::Endpoints;
    use serde_json::json;

    fn service(dir: &std::path::Path, base: &str) -> DocsService {
        DocsService::with_endpoints(
            Config {
                cache_dir: Some(dir.to_path_buf()),
                max_retries: 0,
                requests_per_second: 10_000,
                ..Config::default()
            },
            Endpoints {
                flutter_base: base.to_string(),
                dart_base: base.to_string(),
                pub_base: base.to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_tool_returns_ranked_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"packages":[]}"#)
            .create_async()
            .await;

        let tool = SearchTool::new(service(dir.path(), &server.url()));
        let mut args = HashMap::new();
        args.insert("query".to_string(), json!("ListView"));

        let result = tool.execute(args).await.unwrap();
        assert!(!result.is_error);
        let ContentBlock::Text { text } = &result.content[0];
        assert!(text.contains("flutter_class:widgets.ListView"));
        assert!(text.contains("\"partial\": false"));
    }

    #[tokio::test]
    async fn test_search_tool_requires_query() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SearchTool::new(service(dir.path(), "http://127.0.0.1:1"));

        let err = tool.execute(HashMap::new()).await.unwrap_err();
        assert_eq!(err.error_type(), "invalid_arguments");
    }

    #[tokio::test]
    async fn test_legacy_alias_rejects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SearchFlutterDocsTool::new(service(dir.path(), "http://127.0.0.1:1"));

        let mut args = HashMap::new();
        args.insert("query".to_string(), json!("x"));
        args.insert("limit".to_string(), json!(5));

        // The legacy surface has no limit parameter
        let err = tool.execute(args).await.unwrap_err();
        assert_eq!(err.error_type(), "invalid_input");
    }
}
