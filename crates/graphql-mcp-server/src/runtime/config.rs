use crate::auth::AuthConfig;
use crate::server::Transport;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use super::logging::Logging;

/// Configuration for the MCP server
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The target GraphQL endpoint
    pub endpoint: Url,

    /// Login credentials for bearer-token authentication
    pub auth: AuthConfig,

    /// Whether the query_graphql tool may execute mutations
    pub allow_mutations: bool,

    /// Path to a local introspection result; when set, introspect_schema
    /// reads this file instead of calling the endpoint
    pub schema: Option<PathBuf>,

    /// Hard-coded headers to include in all GraphQL requests, as a JSON
    /// object string
    pub headers: String,

    /// Override path for the introspection query document
    pub introspection_query: Option<PathBuf>,

    /// Include stack traces in error payloads
    pub debug: bool,

    /// Logging configuration
    pub logging: Logging,

    /// The type of server transport to use
    pub transport: Transport,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            auth: AuthConfig::default(),
            allow_mutations: false,
            schema: None,
            headers: "{}".to_string(),
            introspection_query: None,
            debug: false,
            logging: Logging::default(),
            transport: Transport::default(),
        }
    }
}

mod defaults {
    use url::Url;

    pub(super) fn endpoint() -> Url {
        // SAFETY: this is a constant and is covered by [tests::default_endpoint_parses_correctly]
        #[allow(clippy::unwrap_used)]
        Url::parse("http://127.0.0.1:4000/graphql").unwrap()
    }

}
