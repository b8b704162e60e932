use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use graphql_mcp_server::auth::AuthClient;
use graphql_mcp_server::error_payload::ErrorNormalizer;
use graphql_mcp_server::gateway::GraphQLGateway;
use graphql_mcp_server::runtime;
use graphql_mcp_server::server::Server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the MCP server
#[derive(Debug, clap::Parser)]
#[command(
    styles = STYLES,
    about = "GraphQL MCP Server - proxy GraphQL operations from an AI agent to an authenticated endpoint",
    version
)]
struct Args {
    /// Path to the YAML configuration file; falls back to GRAPHQL_MCP_*
    /// environment variables when omitted
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match args.config {
        Some(path) => runtime::read_config(path)?,
        None => runtime::read_config_from_env()?,
    };
    runtime::setup_logging(&config)?;

    info!("GraphQL MCP Server v{}", std::env!("CARGO_PKG_VERSION"));

    let auth = Arc::new(AuthClient::new(config.auth));
    let mut gateway = GraphQLGateway::new(
        config.endpoint,
        config.allow_mutations,
        config.schema,
        config.headers,
        config.introspection_query,
        auth,
        ErrorNormalizer::new(config.debug),
    );
    gateway.initialize().await?;

    Ok(Server::builder()
        .transport(config.transport)
        .gateway(gateway)
        .build()
        .start()
        .await?)
}
