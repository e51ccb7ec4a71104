//! Flutter MCP Server
//!
//! Real-time Flutter/Dart documentation for AI assistants over the Model
//! Context Protocol.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use flutter_mcp_server::config::{Args, Config, Transport};
use flutter_mcp_server::error::Result;
use flutter_mcp_server::mcp::handler::McpHandler;
use flutter_mcp_server::mcp::server::McpServer;
use flutter_mcp_server::mcp::transport::StdioTransport;
use flutter_mcp_server::service::DocsService;
use flutter_mcp_server::{http, tools, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr: stdout belongs to the JSON-RPC protocol
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config: Config = args.into();

    info!("Flutter MCP Server v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    let service = DocsService::new(config.clone())?;

    // Cache maintenance: an explicit full purge when asked, otherwise a
    // startup sweep of expired rows. Cache errors degrade, never abort.
    if config.clear_cache {
        match service.cache().purge_all().await {
            Ok(n) => info!("Cleared {} cached documents", n),
            Err(e) => warn!(error = %e, "cache clear failed"),
        }
    } else {
        match service.cache().purge_expired().await {
            Ok(0) => {}
            Ok(n) => info!("Swept {} expired cache rows", n),
            Err(e) => warn!(error = %e, "startup cache sweep failed"),
        }
    }

    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, service);
    info!("Registered {} tools", handler.tool_count());

    match config.transport {
        Transport::Stdio => {
            let server = McpServer::new(handler, "flutter-mcp-server");
            server.run(StdioTransport::new()).await?;
        }
        Transport::Http => {
            http::start_server(&config, Arc::new(handler)).await?;
        }
    }

    Ok(())
}
