//! The MCP server hosting the gateway tools.

use crate::errors::{McpError, ServerError};
use crate::gateway::GraphQLGateway;
use crate::tools::introspect_schema::{INTROSPECT_SCHEMA_TOOL_NAME, IntrospectSchema};
use crate::tools::query_graphql::{QUERY_GRAPHQL_TOOL_NAME, QueryGraphQL};
use bon::bon;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ErrorCode, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo,
};
use rmcp::serde_json::Value;
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{RoleServer, ServerHandler, ServiceExt, serde_json};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

/// How the server is reachable by the MCP client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transport {
    /// Communicate over stdin/stdout; logs go to stderr
    #[default]
    Stdio,

    /// Serve the MCP Streamable HTTP transport at `/mcp`
    StreamableHttp {
        #[serde(default = "defaults::address")]
        address: IpAddr,
        #[serde(default = "defaults::port")]
        port: u16,
    },
}

mod defaults {
    use std::net::{IpAddr, Ipv4Addr};

    pub(super) fn address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    pub(super) fn port() -> u16 {
        5000
    }
}

pub struct Server {
    transport: Transport,
    gateway: GraphQLGateway,
}

#[bon]
impl Server {
    #[builder]
    pub fn new(transport: Transport, gateway: GraphQLGateway) -> Self {
        Self { transport, gateway }
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let gateway = Arc::new(self.gateway);
        let running = Running {
            introspect_schema_tool: IntrospectSchema::new(gateway.clone()),
            query_graphql_tool: QueryGraphQL::new(gateway),
        };

        match self.transport {
            Transport::StreamableHttp { address, port } => {
                info!(port = ?port, address = ?address, "Starting MCP server in Streamable HTTP mode");
                let listen_address = SocketAddr::new(address, port);
                let service = StreamableHttpService::new(
                    move || Ok(running.clone()),
                    LocalSessionManager::default().into(),
                    StreamableHttpServerConfig {
                        sse_keep_alive: None,
                        stateful_mode: true,
                    },
                );
                let router = axum::Router::new().nest_service("/mcp", service);
                let tcp_listener = tokio::net::TcpListener::bind(listen_address).await?;
                axum::serve(tcp_listener, router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
            }
            Transport::Stdio => {
                info!("Starting MCP server in stdio mode");
                let service = running.serve(stdio()).await.inspect_err(|e| {
                    error!("serving error: {:?}", e);
                })?;
                service.waiting().await.map_err(ServerError::StartupError)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
struct Running {
    introspect_schema_tool: IntrospectSchema,
    query_graphql_tool: QueryGraphQL,
}

impl ServerHandler for Running {
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if request.name == INTROSPECT_SCHEMA_TOOL_NAME {
            self.introspect_schema_tool.execute().await
        } else if request.name == QUERY_GRAPHQL_TOOL_NAME {
            self.query_graphql_tool
                .execute(convert_arguments(request)?)
                .await
        } else {
            Err(tool_not_found(&request.name))
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: vec![
                self.introspect_schema_tool.tool.clone(),
                self.query_graphql_tool.tool.clone(),
            ],
        })
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn tool_not_found(name: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Tool {} not found", name),
        None,
    )
}

fn convert_arguments<T: serde::de::DeserializeOwned>(
    arguments: CallToolRequestParam,
) -> Result<T, McpError> {
    serde_json::from_value(Value::from(arguments.arguments))
        .map_err(|_| McpError::new(ErrorCode::INVALID_PARAMS, "Invalid input".to_string(), None))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "Failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => error!(%error, "Failed to install SIGTERM signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
