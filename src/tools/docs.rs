//! The `docs` tool and its legacy aliases.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::document::Topic;
use crate::error::{Error, Result};
use crate::mcp::handler::{
    envelope_result, get_optional_string_arg, get_optional_usize_arg, get_string_arg,
    json_result, reject_unknown_keys, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::service::DocsService;

/// Shared execution path: run the docs pipeline, wrap errors in the
/// envelope instead of failing the RPC.
async fn run_docs(
    service: &DocsService,
    identifier: &str,
    topic: Option<Topic>,
    max_tokens: Option<usize>,
) -> Result<ToolResult> {
    match service.docs(identifier, topic, max_tokens).await {
        Ok(response) => json_result(&response),
        Err(e) => Ok(envelope_result(
            &e,
            Some(serde_json::json!({ "identifier": identifier })),
        )),
    }
}

/// Fetch documentation for any identifier.
pub struct DocsTool {
    service: DocsService,
}

impl DocsTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for DocsTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "docs",
            "Get Flutter/Dart documentation for a class, pub.dev package, or concept. \
             Accepts identifiers like 'Container', 'material.AppBar', 'dart:async.Future', \
             'pub:provider' or 'pub:provider:^6.0.0'.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "identifier": {
                        "type": "string",
                        "description": "What to document (widget, library.Class, dart:library.Class, pub:package[:version])"
                    },
                    "topic": {
                        "type": "string",
                        "enum": ["summary", "constructors", "properties", "methods", "examples",
                                 "getting-started", "changelog", "api", "installation"],
                        "description": "Return only the matching section"
                    },
                    "max_tokens": {
                        "type": "integer",
                        "minimum": 500,
                        "description": "Token budget for the response (default 10000)"
                    }
                },
                "required": ["identifier"]
            }),
        )
        .with_annotations(ToolAnnotations::read_only_open_world().with_title("Get Documentation"))
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &["identifier", "topic", "max_tokens"])?;

        let identifier = get_string_arg(&args, "identifier")?;
        let topic = match get_optional_string_arg(&args, "topic") {
            Some(raw) => Some(Topic::parse(&raw).ok_or_else(|| {
                Error::InvalidInput(format!("unknown topic '{raw}'"))
            })?),
            None => None,
        };
        let max_tokens = get_optional_usize_arg(&args, "max_tokens")?;

        run_docs(&self.service, &identifier, topic, max_tokens).await
    }
}

/// Legacy alias: `get_flutter_docs(class_name, library)`.
pub struct GetFlutterDocsTool {
    service: DocsService,
}

impl GetFlutterDocsTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GetFlutterDocsTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "get_flutter_docs",
            "Get Flutter class documentation (legacy alias of 'docs').",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "class_name": {
                        "type": "string",
                        "description": "Name of the Flutter class (e.g. 'Container', 'Scaffold')"
                    },
                    "library": {
                        "type": "string",
                        "description": "Flutter library (e.g. 'widgets', 'material', 'cupertino')"
                    }
                },
                "required": ["class_name"]
            }),
        )
        .with_annotations(ToolAnnotations::read_only_open_world())
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &["class_name", "library"])?;

        let class_name = get_string_arg(&args, "class_name")?;
        let identifier = match get_optional_string_arg(&args, "library") {
            Some(library) => format!("{library}.{class_name}"),
            None => class_name,
        };

        run_docs(&self.service, &identifier, None, None).await
    }
}

/// Legacy alias: `get_pub_package_info(package_name, version?)`.
pub struct GetPubPackageInfoTool {
    service: DocsService,
}

impl GetPubPackageInfoTool {
    pub fn new(service: DocsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GetPubPackageInfoTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "get_pub_package_info",
            "Get pub.dev package information including README (legacy alias of 'docs').",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "package_name": {
                        "type": "string",
                        "description": "Name of the pub.dev package (e.g. 'provider', 'dio')"
                    },
                    "version": {
                        "type": "string",
                        "description": "Version constraint (e.g. '6.0.5', '^6.0.0', 'latest')"
                    }
                },
                "required": ["package_name"]
            }),
        )
        .with_annotations(ToolAnnotations::read_only_open_world())
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        reject_unknown_keys(&args, &["package_name", "version"])?;

        let package = get_string_arg(&args, "package_name")?;
        let identifier = match get_optional_string_arg(&args, "version") {
            Some(version) => format!("pub:{package}:{version}"),
            None => format!("pub:{package}"),
        };

        run_docs(&self.service, &identifier, None, None).await
    }
}
