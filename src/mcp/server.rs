//! MCP server implementation.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::*;
use crate::mcp::transport::{Message, Transport};
use crate::VERSION;

/// MCP server.
pub struct McpServer {
    handler: Arc<McpHandler>,
    name: String,
    version: String,
    /// Requests currently being processed.
    active_requests: Arc<RwLock<HashSet<RequestId>>>,
    /// Requests the client cancelled.
    cancelled_requests: Arc<RwLock<HashSet<RequestId>>>,
}

impl McpServer {
    /// Create a new MCP server around a tool registry.
    pub fn new(handler: McpHandler, name: impl Into<String>) -> Self {
        Self {
            handler: Arc::new(handler),
            name: name.into(),
            version: VERSION.to_string(),
            active_requests: Arc::new(RwLock::new(HashSet::new())),
            cancelled_requests: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Whether the client cancelled the given request.
    pub async fn is_cancelled(&self, id: &RequestId) -> bool {
        self.cancelled_requests.read().await.contains(id)
    }

    /// Mark a request as cancelled.
    pub async fn cancel_request(&self, id: &RequestId) {
        self.cancelled_requests.write().await.insert(id.clone());
    }

    /// Drop a request from both tracking sets.
    pub async fn complete_request(&self, id: &RequestId) {
        self.active_requests.write().await.remove(id);
        self.cancelled_requests.write().await.remove(id);
    }

    /// Run the message loop on the provided transport until EOF.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => {
                    let response = self.handle_request(req).await;
                    if outgoing.send(Message::Response(response)).await.is_err() {
                        error!("Failed to send response");
                        break;
                    }
                }
                Message::Notification(notif) => {
                    self.handle_notification(notif).await;
                }
                Message::Response(_) => {
                    warn!("Received unexpected response");
                }
            }
        }

        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %req.method, id = ?req.id, "handling request");

        self.active_requests.write().await.insert(req.id.clone());

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(req.params).await,
            _ => Err(Error::McpProtocol(format!(
                "Unknown method: {}",
                req.method
            ))),
        };

        self.complete_request(&req.id).await;

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: req.id,
                result: Some(value),
                error: None,
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: req.id,
                result: None,
                error: Some(JsonRpcError {
                    code: match &e {
                        Error::McpProtocol(_) => error_codes::METHOD_NOT_FOUND,
                        Error::InvalidToolArguments(_) => error_codes::INVALID_PARAMS,
                        _ => error_codes::INTERNAL_ERROR,
                    },
                    message: e.to_string(),
                    data: None,
                }),
            },
        }
    }

    async fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!(method = %notif.method, "handling notification");

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                if let Some(params) = notif.params {
                    #[derive(serde::Deserialize)]
                    struct CancelledParams {
                        #[serde(rename = "requestId")]
                        request_id: RequestId,
                    }
                    if let Ok(cancel) = serde_json::from_value::<CancelledParams>(params) {
                        info!(id = ?cancel.request_id, "cancelling request");
                        self.cancel_request(&cancel.request_id).await;
                    }
                }
            }
            _ => {
                debug!(method = %notif.method, "unknown notification");
            }
        }
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                logging: Some(LoggingCapability {}),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> Result<Value> {
        let tools = self.handler.list_tools();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let handler = self
            .handler
            .get_tool(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        let result = handler.execute(params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::json_result;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct PingTool;

    #[async_trait]
    impl crate::mcp::handler::ToolHandler for PingTool {
        fn definition(&self) -> Tool {
            Tool::new("ping_tool", "Ping", serde_json::json!({"type": "object"}))
        }

        async fn execute(&self, _: HashMap<String, Value>) -> Result<crate::mcp::ToolResult> {
            json_result(&serde_json::json!({"pong": true}))
        }
    }

    fn server() -> McpServer {
        let mut handler = McpHandler::new();
        handler.register(PingTool);
        McpServer::new(handler, "flutter-mcp-server")
    }

    #[tokio::test]
    async fn test_initialize_reports_tools_capability() {
        let value = server().handle_initialize().unwrap();
        assert_eq!(value["protocolVersion"], MCP_VERSION);
        assert!(value["capabilities"]["tools"].is_object());
        assert_eq!(value["serverInfo"]["name"], "flutter-mcp-server");
    }

    #[tokio::test]
    async fn test_request_dispatch() {
        let srv = server();
        let response = srv
            .handle_request(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: RequestId::Number(1),
                method: "tools/list".to_string(),
                params: None,
            })
            .await;

        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "ping_tool");
    }

    #[tokio::test]
    async fn test_unknown_method_errors() {
        let response = server()
            .handle_request(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: RequestId::Number(2),
                method: "bogus/method".to_string(),
                params: None,
            })
            .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_call_unknown_tool_errors() {
        let response = server()
            .handle_request(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: RequestId::Number(3),
                method: "tools/call".to_string(),
                params: Some(serde_json::json!({"name": "missing_tool"})),
            })
            .await;

        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn test_cancellation_tracking() {
        let srv = server();
        let id = RequestId::String("req-1".to_string());

        srv.handle_notification(JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/cancelled".to_string(),
            params: Some(serde_json::json!({"requestId": "req-1"})),
        })
        .await;

        assert!(srv.is_cancelled(&id).await);
        srv.complete_request(&id).await;
        assert!(!srv.is_cancelled(&id).await);
    }
}
