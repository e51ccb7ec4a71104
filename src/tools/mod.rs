//! MCP tool implementations.
//!
//! The modern surface is three tools:
//!
//! - `docs` - fetch a documentation page by identifier
//! - `search` - unified search across sources
//! - `status` - cache and upstream health
//!
//! The legacy aliases (`get_flutter_docs`, `get_pub_package_info`,
//! `search_flutter_docs`, `process_flutter_mentions`, `health_check`) are
//! registered as first-class tools and map onto the same service calls.

pub mod docs;
pub mod mentions;
pub mod search;
pub mod status;

use crate::mcp::handler::McpHandler;
use crate::service::DocsService;

/// Register every tool with the handler.
pub fn register_all_tools(handler: &mut McpHandler, service: DocsService) {
    // Modern surface
    handler.register(docs::DocsTool::new(service.clone()));
    handler.register(search::SearchTool::new(service.clone()));
    handler.register(status::StatusTool::new(service.clone()));

    // Legacy aliases
    handler.register(docs::GetFlutterDocsTool::new(service.clone()));
    handler.register(docs::GetPubPackageInfoTool::new(service.clone()));
    handler.register(search::SearchFlutterDocsTool::new(service.clone()));
    handler.register(mentions::ProcessFlutterMentionsTool::new(service.clone()));
    handler.register(status::HealthCheckTool::new(service));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_all_tools_registered() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let service = DocsService::new(config).unwrap();

        let mut handler = McpHandler::new();
        register_all_tools(&mut handler, service);

        for name in [
            "docs",
            "search",
            "status",
            "get_flutter_docs",
            "get_pub_package_info",
            "search_flutter_docs",
            "process_flutter_mentions",
            "health_check",
        ] {
            assert!(handler.has_tool(name), "missing tool {name}");
        }
        assert_eq!(handler.tool_count(), 8);
    }
}
