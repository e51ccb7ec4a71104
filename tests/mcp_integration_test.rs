//! MCP Server Integration Tests
//!
//! These tests verify the server works with real MCP clients by spawning
//! the binary and speaking JSON-RPC over stdio. Nothing here touches the
//! network: only the local tool surface (initialize, tools/list, status)
//! is exercised.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

/// MCP test client communicating with the server via stdio.
struct McpTestClient {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    request_id: i64,
}

impl McpTestClient {
    /// Spawn the server with an isolated cache directory.
    fn spawn(cache_dir: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut child = Command::cargo_bin("flutter-mcp")?
            .arg("--transport")
            .arg("stdio")
            .arg("--cache-dir")
            .arg(cache_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = BufReader::new(child.stdout.take().expect("Failed to get stdout"));

        Ok(Self {
            child,
            stdin,
            stdout,
            request_id: 0,
        })
    }

    /// Send a JSON-RPC request and read the response.
    fn request(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        self.request_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id,
            "method": method,
            "params": params
        });

        writeln!(self.stdin, "{}", serde_json::to_string(&request)?)?;
        self.stdin.flush()?;

        let mut response_line = String::new();
        self.stdout.read_line(&mut response_line)?;

        let response: Value = serde_json::from_str(&response_line)?;
        Ok(response)
    }

    fn initialize(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        self.request(
            "initialize",
            json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            }),
        )
    }

    fn list_tools(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        self.request("tools/list", json!({}))
    }

    fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
    }
}

impl Drop for McpTestClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_binary_help() {
    AssertCommand::cargo_bin("flutter-mcp")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MCP server"));
}

#[test]
fn test_binary_version() {
    AssertCommand::cargo_bin("flutter-mcp")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flutter-mcp"));
}

#[test]
fn test_mcp_initialize() {
    let cache = TempDir::new().expect("temp dir");
    let mut client =
        McpTestClient::spawn(cache.path().to_str().unwrap()).expect("Failed to spawn server");

    let response = client.initialize().expect("Failed to initialize");
    let result = &response["result"];

    assert!(result.get("protocolVersion").is_some(), "Expected protocolVersion");
    assert_eq!(result["serverInfo"]["name"], "flutter-mcp-server");
    assert!(result["capabilities"]["tools"].is_object(), "Expected tools capability");
}

#[test]
fn test_mcp_list_tools_has_full_surface() {
    let cache = TempDir::new().expect("temp dir");
    let mut client =
        McpTestClient::spawn(cache.path().to_str().unwrap()).expect("Failed to spawn server");

    client.initialize().expect("Failed to initialize");
    let response = client.list_tools().expect("Failed to list tools");

    let tools = response["result"]["tools"]
        .as_array()
        .expect("tools should be array");
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();

    for expected in [
        "docs",
        "search",
        "status",
        "get_flutter_docs",
        "get_pub_package_info",
        "search_flutter_docs",
        "process_flutter_mentions",
        "health_check",
    ] {
        assert!(names.contains(&expected), "missing tool: {expected}");
    }

    // Every tool declares an object input schema
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object", "tool: {}", tool["name"]);
    }
}

#[test]
fn test_mcp_status_tool_roundtrip() {
    let cache = TempDir::new().expect("temp dir");
    let mut client =
        McpTestClient::spawn(cache.path().to_str().unwrap()).expect("Failed to spawn server");

    client.initialize().expect("Failed to initialize");
    let response = client
        .call_tool("status", json!({}))
        .expect("Failed to call status");

    let content = response["result"]["content"]
        .as_array()
        .expect("content array");
    let text = content[0]["text"].as_str().expect("text content");
    let status: Value = serde_json::from_str(text).expect("status JSON");

    assert_eq!(status["status"], "healthy");
    assert!(status["cache"]["entries"].is_number());
    assert_eq!(status["upstreams"]["flutter_docs"], "operational");
}

#[test]
fn test_mcp_unknown_tool_is_error() {
    let cache = TempDir::new().expect("temp dir");
    let mut client =
        McpTestClient::spawn(cache.path().to_str().unwrap()).expect("Failed to spawn server");

    client.initialize().expect("Failed to initialize");
    let response = client
        .call_tool("definitely_not_a_tool", json!({}))
        .expect("request should still get a response");

    assert!(response.get("error").is_some(), "Expected JSON-RPC error");
}

#[test]
fn test_mcp_docs_rejects_unknown_option() {
    let cache = TempDir::new().expect("temp dir");
    let mut client =
        McpTestClient::spawn(cache.path().to_str().unwrap()).expect("Failed to spawn server");

    client.initialize().expect("Failed to initialize");
    let response = client
        .call_tool("docs", json!({"identifier": "Container", "verbosity": "high"}))
        .expect("request should still get a response");

    let error = response["error"]["message"].as_str().unwrap_or_default();
    assert!(error.contains("verbosity"), "unexpected error: {error}");
}

#[test]
fn test_mcp_ping() {
    let cache = TempDir::new().expect("temp dir");
    let mut client =
        McpTestClient::spawn(cache.path().to_str().unwrap()).expect("Failed to spawn server");

    let response = client.request("ping", json!({})).expect("ping");
    assert!(response["result"].is_object());
}
