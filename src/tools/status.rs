//! The `status` tool and its legacy alias.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::handler::{json_result, reject_unknown_keys, ToolHandler};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::service::DocsService;

/// Cache and upstream health.
pub struct StatusTool {
    service: DocsService,
}

impl StatusTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for StatusTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "status",
            "Report server health: cache statistics and per-upstream availability.",
            serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        )
        .with_annotations(ToolAnnotations::read_only().with_title("Server Status"))
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &[])?;
        json_result(&self.service.status().await)
    }
}

/// Legacy alias: `health_check()`.
pub struct HealthCheckTool {
    service: DocsService,
}

impl HealthCheckTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for HealthCheckTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "health_check",
            "Check the health of the documentation service (legacy alias of 'status').",
            serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        )
        .with_annotations(ToolAnnotations::read_only())
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &[])?;
        json_result(&self.service.status().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mcp::protocol::ContentBlock;
    use serde_json::json;

    fn service(dir: &std::path::Path) -> DocsService {
        DocsService::new(Config {
            cache_dir: Some(dir.to_path_buf()),
            ..Config::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_status_tool_reports_shape() {
        let dir = tempfile::tempdir().unwrap();
        let tool = StatusTool::new(service(dir.path()));

        let result = tool.execute(HashMap::new()).await.unwrap();
        assert!(!result.is_error);

        let ContentBlock::Text { text } = &result.content[0];
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed["status"], "healthy");
        assert!(parsed["cache"]["entries"].is_number());
        assert_eq!(parsed["upstreams"]["flutter_docs"], "operational");
        assert!(parsed["uptime_ms"].is_number());
    }

    #[tokio::test]
    async fn test_status_rejects_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let tool = StatusTool::new(service(dir.path()));

        let mut args = HashMap::new();
        args.insert("verbose".to_string(), json!(true));
        assert!(tool.execute(args).await.is_err());
    }

    #[tokio::test]
    async fn test_health_check_matches_status() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let status = StatusTool::new(svc.clone());
        let health = HealthCheckTool::new(svc);

        let a = status.execute(HashMap::new()).await.unwrap();
        let b = health.execute(HashMap::new()).await.unwrap();

        let ContentBlock::Text { text: ta } = &a.content[0];
        let ContentBlock::Text { text: tb } = &b.content[0];
        let va: Value = serde_json::from_str(ta).unwrap();
        let vb: Value = serde_json::from_str(tb).unwrap();
        assert_eq!(va["status"], vb["status"]);
        assert_eq!(va["upstreams"], vb["upstreams"]);
    }
}
