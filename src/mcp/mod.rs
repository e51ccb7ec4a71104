//! Model Context Protocol (MCP) implementation.
//!
//! A minimal MCP server: JSON-RPC message handling, a stdio transport and
//! a tool registry. The documentation tools are the only capability this
//! server exposes.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `server` - MCP server implementation
//! - `transport` - Transport layer (stdio)
//! - `handler` - Tool registry and argument helpers

pub mod handler;
pub mod protocol;
pub mod server;
pub mod transport;

pub use handler::McpHandler;
pub use protocol::*;
pub use server::McpServer;
pub use transport::{StdioTransport, Transport};
