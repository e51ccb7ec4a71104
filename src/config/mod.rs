//! Configuration management for the Flutter MCP server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Command-line arguments for the Flutter MCP server.
#[derive(Parser, Debug, Clone)]
#[command(name = "flutter-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server for real-time Flutter/Dart documentation")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "FLUTTER_MCP_TRANSPORT")]
    pub transport: Transport,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "FLUTTER_MCP_PORT")]
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long, env = "DEBUG")]
    pub debug: bool,

    /// Override the cache directory
    #[arg(long, env = "CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum retry attempts for upstream requests
    #[arg(long, default_value = "3", env = "MAX_RETRIES")]
    pub max_retries: u32,

    /// Base retry delay in seconds
    #[arg(long, default_value = "1.0", env = "BASE_RETRY_DELAY")]
    pub base_retry_delay: f64,

    /// Maximum retry delay in seconds
    #[arg(long, default_value = "16.0", env = "MAX_RETRY_DELAY")]
    pub max_retry_delay: f64,

    /// Upstream requests per second, per host
    #[arg(long, default_value = "2", env = "REQUESTS_PER_SECOND")]
    pub requests_per_second: u32,

    /// Consecutive failures before an upstream circuit opens
    #[arg(long, default_value = "5", env = "FAILURE_THRESHOLD")]
    pub failure_threshold: u32,

    /// Seconds before an open circuit allows a probe
    #[arg(long, default_value = "60", env = "RECOVERY_TIMEOUT")]
    pub recovery_timeout: u64,

    /// Count tokens with the exact tokenizer instead of the word heuristic
    #[arg(long, env = "FLUTTER_MCP_ACCURATE_TOKENS")]
    pub accurate_tokens: bool,

    /// Drop every cached document on startup
    #[arg(long)]
    pub clear_cache: bool,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// Cache directory override (platform cache dir when unset)
    pub cache_dir: Option<PathBuf>,
    /// Maximum retry attempts
    pub max_retries: u32,
    /// Base retry delay in seconds
    pub base_retry_delay: f64,
    /// Maximum retry delay in seconds
    pub max_retry_delay: f64,
    /// Upstream requests per second, per host
    pub requests_per_second: u32,
    /// Circuit breaker failure threshold
    pub failure_threshold: u32,
    /// Circuit breaker recovery timeout in seconds
    pub recovery_timeout: u64,
    /// Exact token counting
    pub accurate_tokens: bool,
    /// Clear the cache on startup
    pub clear_cache: bool,
    /// Deadline for an externally initiated operation, in seconds
    pub request_timeout: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            port: args.port,
            debug: args.debug,
            cache_dir: args.cache_dir,
            max_retries: args.max_retries,
            base_retry_delay: args.base_retry_delay,
            max_retry_delay: args.max_retry_delay,
            requests_per_second: args.requests_per_second,
            failure_threshold: args.failure_threshold,
            recovery_timeout: args.recovery_timeout,
            accurate_tokens: args.accurate_tokens,
            clear_cache: args.clear_cache,
            request_timeout: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            port: 3000,
            debug: false,
            cache_dir: None,
            max_retries: 3,
            base_retry_delay: 1.0,
            max_retry_delay: 16.0,
            requests_per_second: 2,
            failure_threshold: 5,
            recovery_timeout: 60,
            accurate_tokens: false,
            clear_cache: false,
            request_timeout: 30,
        }
    }
}

impl Config {
    /// Path of the cache database file.
    ///
    /// `CACHE_DIR` overrides the platform cache directory
    /// (`$XDG_CACHE_HOME/flutter-mcp` or the OS equivalent).
    pub fn cache_db_path(&self) -> Result<PathBuf> {
        let dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("dev", "flutter-mcp", "flutter-mcp")
                .map(|dirs| dirs.cache_dir().to_path_buf())
                .ok_or_else(|| {
                    Error::Internal("could not determine a platform cache directory".to_string())
                })?,
        };
        Ok(dir.join("cache.db"))
    }

    /// Request deadline as a [`Duration`].
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_default() {
        assert_eq!(Transport::default(), Transport::Stdio);
    }

    #[test]
    fn test_transport_serialization() {
        assert_eq!(
            serde_json::to_string(&Transport::Stdio).unwrap(),
            "\"stdio\""
        );
        assert_eq!(serde_json::to_string(&Transport::Http).unwrap(), "\"http\"");
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.port, 3000);
        assert!(!config.debug);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_retry_delay, 1.0);
        assert_eq!(config.max_retry_delay, 16.0);
        assert_eq!(config.requests_per_second, 2);
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.recovery_timeout, 60);
        assert_eq!(config.request_timeout, 30);
    }

    #[test]
    fn test_cache_db_path_override() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/flutter-mcp-test")),
            ..Config::default()
        };
        assert_eq!(
            config.cache_db_path().unwrap(),
            PathBuf::from("/tmp/flutter-mcp-test/cache.db")
        );
    }

    #[test]
    fn test_args_to_config() {
        let args = Args {
            transport: Transport::Http,
            port: 4000,
            debug: true,
            cache_dir: Some(PathBuf::from("/var/cache/fm")),
            max_retries: 5,
            base_retry_delay: 0.5,
            max_retry_delay: 8.0,
            requests_per_second: 4,
            failure_threshold: 3,
            recovery_timeout: 30,
            accurate_tokens: true,
            clear_cache: false,
        };

        let config: Config = args.into();

        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.port, 4000);
        assert!(config.debug);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/fm")));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.requests_per_second, 4);
        assert!(config.accurate_tokens);
    }
}
