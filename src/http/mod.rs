//! HTTP transport for the MCP tool surface.
//!
//! An alternative to stdio for web-based clients: the same tool registry
//! served over plain HTTP endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::*;

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    handler: Arc<McpHandler>,
    server_info: ServerInfo,
}

/// Start the HTTP server; runs until the process exits.
pub async fn start_server(config: &Config, handler: Arc<McpHandler>) -> Result<()> {
    let state = HttpState {
        handler,
        server_info: ServerInfo {
            name: "flutter-mcp-server".to_string(),
            version: crate::VERSION.to_string(),
        },
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/mcp/initialize", post(initialize))
        .route("/mcp/tools/list", get(list_tools))
        .route("/mcp/tools/call", post(call_tool))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!(addr, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::Error::HttpServer(e.to_string()))?;

    Ok(())
}

/// Liveness endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "server": state.server_info.name,
        "version": state.server_info.version,
    }))
}

async fn initialize(State(state): State<HttpState>) -> impl IntoResponse {
    let result = InitializeResult {
        protocol_version: MCP_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
            logging: Some(LoggingCapability {}),
        },
        server_info: state.server_info.clone(),
    };
    Json(result)
}

async fn list_tools(State(state): State<HttpState>) -> impl IntoResponse {
    Json(ListToolsResult {
        tools: state.handler.list_tools(),
    })
}

#[derive(Deserialize)]
struct CallToolBody {
    name: String,
    #[serde(default)]
    arguments: HashMap<String, Value>,
}

async fn call_tool(
    State(state): State<HttpState>,
    Json(body): Json<CallToolBody>,
) -> impl IntoResponse {
    let Some(tool) = state.handler.get_tool(&body.name) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("Tool not found: {}", body.name)})),
        );
    };

    match tool.execute(body.arguments).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::to_value(result).unwrap_or_default()),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
    }
}
