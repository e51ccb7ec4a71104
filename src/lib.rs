//! Flutter MCP Server
//!
//! A Model Context Protocol (MCP) server that serves real-time Flutter/Dart
//! API reference and pub.dev package metadata to AI assistants, backed by a
//! resilient fetch-process-cache core.
//!
//! # Architecture
//!
//! 1. **Upstream layer** (`upstream`) - rate-limited, circuit-broken HTTP
//!    fetch with retry and backoff
//! 2. **Resolution layer** (`resolver`) - identifier classification, URL
//!    derivation, semantic version resolution
//! 3. **Document layer** (`document`) - HTML/JSON to canonical Markdown,
//!    token accounting, priority-based truncation
//! 4. **Service layer** (`service`) - fetch pipeline, single-flight
//!    deduplication, durable cache
//! 5. **MCP layer** (`mcp`) - protocol implementation, transport handling
//! 6. **Tools layer** (`tools`) - `docs`, `search`, `status` plus the legacy
//!    tool aliases

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod mcp;
pub mod resolver;
pub mod search;
pub mod service;
pub mod tools;
pub mod types;
pub mod upstream;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed User-Agent sent on every upstream request.
pub const USER_AGENT: &str = concat!(
    "flutter-mcp-server/",
    env!("CARGO_PKG_VERSION"),
    " (github.com/flutter-mcp/flutter-mcp)"
);

/// Default token budget for a docs response.
pub const DEFAULT_MAX_TOKENS: usize = 10_000;

/// Smallest accepted token budget.
pub const MIN_MAX_TOKENS: usize = 500;
