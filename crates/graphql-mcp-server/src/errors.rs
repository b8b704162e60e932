use reqwest::StatusCode;
use rmcp::serde_json;
use std::path::PathBuf;
use tokio::task::JoinError;

/// A fault that can be reported in an error payload.
///
/// The kind name is the stable identifier exposed to callers through the
/// `exceptionType` field of the payload.
pub trait Fault: std::error::Error {
    fn kind_name(&self) -> &'static str;
}

/// An error during the login exchange
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Login credentials not configured")]
    NotConfigured,

    #[error("Login failed: {0}")]
    Status(StatusCode),

    #[error("Authentication failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl Fault for AuthError {
    fn kind_name(&self) -> &'static str {
        match self {
            AuthError::NotConfigured => "ConfigurationError",
            AuthError::Status(_) | AuthError::Request(_) => "AuthenticationError",
        }
    }
}

/// An error inside a gateway operation, converted to an error payload at the
/// tool boundary
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("GraphQL request failed: {0}")]
    Remote(StatusCode),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Could not read schema file: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Fault for GatewayError {
    fn kind_name(&self) -> &'static str {
        match self {
            GatewayError::Auth(auth_error) => auth_error.kind_name(),
            GatewayError::Remote(_) | GatewayError::Transport(_) => "RemoteError",
            GatewayError::Filesystem(_) => "FilesystemError",
            GatewayError::Json(_) => "SerializationError",
        }
    }
}

/// An error in server initialization
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Introspection query file not found at {path}: {source}")]
    IntrospectionQuery {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not open file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start server")]
    StartupError(#[from] JoinError),

    #[error("Failed to initialize server: {0}")]
    Initialize(#[from] rmcp::service::ServerInitializeError<std::io::Error>),
}

/// An MCP tool error
pub type McpError = rmcp::model::ErrorData;
