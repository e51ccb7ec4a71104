//! Error types for the Flutter MCP server.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Upstream Errors =====
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("Upstream server error: {0}")]
    UpstreamServerError(String),

    // ===== Resolution Errors =====
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No published version satisfies '{constraint}'")]
    VersionNotSatisfiable {
        constraint: String,
        /// Up to ten highest available versions, newest first.
        available: Vec<String>,
    },

    // ===== Cache Errors =====
    #[error("Cache error: {0}")]
    CacheError(String),

    // ===== MCP Errors =====
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP server error: {0}")]
    HttpServer(String),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Timeout: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Cancelled: operation was cancelled")]
    Cancelled,
}

impl Error {
    /// Wire name of the error kind, used in the error envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Network(_) => "network",
            Self::RateLimited(_) => "rate_limited",
            Self::UpstreamServerError(_) => "upstream_server_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::VersionNotSatisfiable { .. } => "version_not_satisfiable",
            Self::CacheError(_) => "cache_error",
            Self::McpProtocol(_) => "mcp_protocol",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::InvalidToolArguments(_) => "invalid_arguments",
            Self::Io(_) => "io_error",
            Self::Json(_) => "serialization_error",
            Self::Http(_) | Self::HttpServer(_) => "network",
            Self::Internal(_) => "internal",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if this error is retriable (transient failures).
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) | Self::UpstreamServerError(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Check if this error counts as a failure for the circuit breaker.
    ///
    /// Only network errors and 5xx responses trip the breaker; 4xx
    /// responses (including 404 and 429) never do.
    pub fn counts_as_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::UpstreamServerError(_) | Self::Timeout { .. }
        )
    }

    /// Produce an equivalent error for sharing across single-flight joiners.
    ///
    /// Variants carrying non-cloneable sources are flattened to their
    /// display text.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::Network(m) => Self::Network(m.clone()),
            Self::RateLimited(m) => Self::RateLimited(m.clone()),
            Self::UpstreamServerError(m) => Self::UpstreamServerError(m.clone()),
            Self::InvalidInput(m) => Self::InvalidInput(m.clone()),
            Self::VersionNotSatisfiable {
                constraint,
                available,
            } => Self::VersionNotSatisfiable {
                constraint: constraint.clone(),
                available: available.clone(),
            },
            Self::CacheError(m) => Self::CacheError(m.clone()),
            Self::McpProtocol(m) => Self::McpProtocol(m.clone()),
            Self::ToolNotFound(m) => Self::ToolNotFound(m.clone()),
            Self::InvalidToolArguments(m) => Self::InvalidToolArguments(m.clone()),
            Self::HttpServer(m) => Self::HttpServer(m.clone()),
            Self::Internal(m) => Self::Internal(m.clone()),
            Self::Timeout { seconds } => Self::Timeout { seconds: *seconds },
            Self::Cancelled => Self::Cancelled,
            Self::Io(e) => Self::Internal(format!("IO error: {e}")),
            Self::Json(e) => Self::Internal(format!("JSON error: {e}")),
            Self::Http(e) => Self::Network(e.to_string()),
        }
    }

    /// Serializable error envelope for tool responses.
    pub fn envelope(&self, context: Option<serde_json::Value>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: true,
            error_type: self.error_type().to_string(),
            message: self.to_string(),
            suggestions: self.suggestions(),
            context,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Context-aware suggestions for the error envelope.
    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound(_) => vec![
                "Check if the name is spelled correctly".into(),
                "Verify that the item exists in the specified library".into(),
                "Try the search tool for similar items".into(),
                "Common libraries: widgets, material, cupertino, painting, rendering".into(),
            ],
            Self::Network(_) | Self::Http(_) | Self::Timeout { .. } => vec![
                "Check your internet connection".into(),
                "The documentation server may be temporarily unavailable".into(),
                "Try again in a few moments".into(),
            ],
            Self::RateLimited(_) => vec![
                "Too many requests in a short time".into(),
                "Wait a few minutes before retrying".into(),
                "Cached documents are still served while rate limited".into(),
            ],
            Self::VersionNotSatisfiable { available, .. } => available
                .iter()
                .map(|v| format!("Available version: {v}"))
                .collect(),
            Self::InvalidInput(_) => vec![
                "Use a widget name like 'Container', 'library.Class' like 'material.AppBar', \
                 'dart:async.Future', or 'pub:provider'"
                    .into(),
                "Version specs accept '1.2.3', '^1.2.3', '>=1.0.0 <2.0.0', or keywords \
                 latest|stable|dev|beta|alpha"
                    .into(),
            ],
            Self::CacheError(_) => vec![
                "The request proceeded without caching".into(),
                "Check disk space and permissions for the cache directory".into(),
            ],
            _ => Vec::new(),
        }
    }
}

/// Wire-format error object returned by tools.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: bool,
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("widgets.Containr".to_string());
        assert_eq!(err.to_string(), "Not found: widgets.Containr");

        let err = Error::VersionNotSatisfiable {
            constraint: ">=99.0.0".to_string(),
            available: vec!["5.0.0".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No published version satisfies '>=99.0.0'"
        );
    }

    #[test]
    fn test_error_type_wire_names() {
        assert_eq!(Error::NotFound(String::new()).error_type(), "not_found");
        assert_eq!(Error::Network(String::new()).error_type(), "network");
        assert_eq!(
            Error::RateLimited(String::new()).error_type(),
            "rate_limited"
        );
        assert_eq!(
            Error::UpstreamServerError(String::new()).error_type(),
            "upstream_server_error"
        );
        assert_eq!(
            Error::InvalidInput(String::new()).error_type(),
            "invalid_input"
        );
        assert_eq!(Error::CacheError(String::new()).error_type(), "cache_error");
    }

    #[test]
    fn test_upstream_failure_classification() {
        // Feeds the breaker
        assert!(Error::Network("dns".into()).counts_as_upstream_failure());
        assert!(Error::UpstreamServerError("502".into()).counts_as_upstream_failure());
        assert!(Error::Timeout { seconds: 30 }.counts_as_upstream_failure());

        // Never trips the breaker
        assert!(!Error::NotFound("x".into()).counts_as_upstream_failure());
        assert!(!Error::RateLimited("429".into()).counts_as_upstream_failure());
        assert!(!Error::InvalidInput("x".into()).counts_as_upstream_failure());
        assert!(!Error::VersionNotSatisfiable {
            constraint: "^9.0.0".into(),
            available: vec![]
        }
        .counts_as_upstream_failure());
    }

    #[test]
    fn test_duplicate_preserves_kind() {
        let err = Error::RateLimited("pub.dev".into());
        assert_eq!(err.duplicate().error_type(), err.error_type());

        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        // Non-cloneable sources flatten to internal
        assert_eq!(io.duplicate().error_type(), "internal");
    }

    #[test]
    fn test_envelope_shape() {
        let err = Error::NotFound("widgets.Containr".into());
        let env = err.envelope(Some(serde_json::json!({"library": "widgets"})));

        assert!(env.error);
        assert_eq!(env.error_type, "not_found");
        assert!(!env.suggestions.is_empty());
        assert!(env.context.is_some());

        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"error\":true"));
        assert!(json.contains("\"error_type\":\"not_found\""));
    }

    #[test]
    fn test_version_not_satisfiable_suggestions() {
        let err = Error::VersionNotSatisfiable {
            constraint: ">=99.0.0".into(),
            available: vec!["6.1.2".into(), "6.0.5".into()],
        };
        let env = err.envelope(None);
        assert_eq!(env.suggestions.len(), 2);
        assert!(env.suggestions[0].contains("6.1.2"));
    }
}
