//! The authenticated GraphQL proxy.
//!
//! The gateway assembles outbound headers once at initialization (static
//! configured headers first, auth headers merged after so they win on
//! collision), gates mutations behind a configuration flag, and performs
//! schema introspection either from a local file or against the live endpoint.
//!
//! Both public operations always return a value. Failures are converted into
//! an [`ErrorPayload`](crate::error_payload::ErrorPayload) at the operation
//! boundary and never propagate to the caller.

use crate::auth::AuthClient;
use crate::error_payload::ErrorNormalizer;
use crate::errors::{GatewayError, ServerError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::serde_json::{self, Map, Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

/// The standard introspection query document, bundled with the server and
/// used when no override path is configured.
const DEFAULT_INTROSPECTION_QUERY: &str =
    include_str!("../graphql/introspection_query.graphql");

/// Returned without any network call when a mutation is attempted while
/// mutations are disabled.
pub const MUTATIONS_NOT_ALLOWED: &str =
    "Mutations are not allowed unless you enable them in the configuration.";

pub struct GraphQLGateway {
    endpoint: Url,
    allow_mutations: bool,
    schema_path: Option<PathBuf>,
    config_headers: String,
    introspection_query_path: Option<PathBuf>,
    introspection_query: String,
    headers: HeaderMap,
    client: reqwest::Client,
    auth: Arc<AuthClient>,
    errors: ErrorNormalizer,
}

impl GraphQLGateway {
    pub fn new(
        endpoint: Url,
        allow_mutations: bool,
        schema_path: Option<PathBuf>,
        config_headers: String,
        introspection_query_path: Option<PathBuf>,
        auth: Arc<AuthClient>,
        errors: ErrorNormalizer,
    ) -> Self {
        Self {
            endpoint,
            allow_mutations,
            schema_path,
            config_headers,
            introspection_query_path,
            introspection_query: String::new(),
            headers: HeaderMap::new(),
            client: reqwest::Client::new(),
            auth,
            errors,
        }
    }

    /// One-time initialization, run before any operation is exposed.
    ///
    /// A missing or unreadable introspection query file is fatal. A malformed
    /// static header string and a failed eager login are logged and the server
    /// continues with whatever headers it has.
    pub async fn initialize(&mut self) -> Result<(), ServerError> {
        self.headers = match serde_json::from_str::<HashMap<String, String>>(&self.config_headers)
        {
            Ok(configured) => parse_headers(configured),
            Err(error) => {
                error!(%error, "Error reading configured headers");
                HeaderMap::new()
            }
        };

        self.introspection_query = match &self.introspection_query_path {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
                ServerError::IntrospectionQuery {
                    path: path.clone(),
                    source,
                }
            })?,
            None => DEFAULT_INTROSPECTION_QUERY.to_string(),
        };

        if self.auth.is_configured() {
            match self.auth.login().await {
                Ok(_) => {
                    info!("Successfully authenticated with the upstream server");
                    self.headers.extend(self.auth.auth_headers().await);
                }
                Err(error) => error!(%error, "Error authenticating with the upstream server"),
            }
        }
        Ok(())
    }

    /// Fetch the schema, either from the configured local file or by running
    /// the introspection query against the live endpoint.
    pub async fn introspect_schema(&self) -> Value {
        match self.try_introspect_schema().await {
            Ok(schema) => schema,
            Err(fault) => self
                .errors
                .create_error_with("Failed to introspect schema", &fault)
                .into_value(),
        }
    }

    async fn try_introspect_schema(&self) -> Result<Value, GatewayError> {
        let schema = match &self.schema_path {
            Some(path) => introspect_local_schema(path).await?,
            None => self.introspect_endpoint().await?,
        };
        Ok(serde_json::from_str(&schema)?)
    }

    /// Execute an arbitrary GraphQL operation against the remote endpoint,
    /// returning the response envelope verbatim. Embedded GraphQL `errors`
    /// arrays are passed through, not reinterpreted as local errors.
    pub async fn query_graphql(&self, query: &str, variables: Option<&str>) -> Value {
        if is_mutation(query) && !self.allow_mutations {
            return self.errors.create_error(MUTATIONS_NOT_ALLOWED).into_value();
        }
        match self.execute_query(query, variables).await {
            Ok(response) => response,
            Err(fault) => self
                .errors
                .create_error_with("Failed to execute GraphQL query", &fault)
                .into_value(),
        }
    }

    async fn execute_query(
        &self,
        query: &str,
        variables: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let variables = match variables.map(str::trim).filter(|json| !json.is_empty()) {
            Some(json) => serde_json::from_str::<Map<String, Value>>(json)?,
            None => Map::new(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(&json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Remote(status));
        }
        Ok(response.json().await?)
    }

    async fn introspect_endpoint(&self) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(&json!({ "query": self.introspection_query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Remote(status));
        }
        Ok(response.text().await?)
    }

    #[cfg(test)]
    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Read the local schema file fully into memory as UTF-8 text. No caching;
/// re-read on every call.
async fn introspect_local_schema(path: &Path) -> Result<String, GatewayError> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// A query is a mutation if, after trimming and case-folding, it starts with
/// the literal token `mutation`.
fn is_mutation(query: &str) -> bool {
    query.trim_start().to_lowercase().starts_with("mutation")
}

fn parse_headers(configured: HashMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(configured.len());
    for (key, value) in configured {
        match (
            HeaderName::from_str(&key),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => error!(header = %key, "Skipping invalid configured header"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use rstest::rstest;

    #[rstest]
    #[case::plain("mutation { doThing }", true)]
    #[case::leading_whitespace("  \n\tmutation AddUser { addUser }", true)]
    #[case::upper_case("MUTATION { doThing }", true)]
    #[case::query("query { things }", false)]
    #[case::anonymous("{ things }", false)]
    #[case::mutation_in_body("query { mutationLog }", false)]
    fn mutation_classification(#[case] query: &str, #[case] expected: bool) {
        assert_eq!(is_mutation(query), expected);
    }

    #[test]
    fn invalid_configured_headers_are_skipped() {
        let mut configured = HashMap::new();
        configured.insert("X-Tenant".to_string(), "acme".to_string());
        configured.insert("bad header".to_string(), "value".to_string());
        let headers = parse_headers(configured);
        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get("X-Tenant").cloned(),
            Some(HeaderValue::from_static("acme"))
        );
    }

    fn gateway(endpoint: &str, allow_mutations: bool) -> GraphQLGateway {
        GraphQLGateway::new(
            Url::parse(endpoint).unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            allow_mutations,
            None,
            "{}".to_string(),
            None,
            Arc::new(AuthClient::new(AuthConfig::default())),
            ErrorNormalizer::new(false),
        )
    }

    #[tokio::test]
    async fn mutation_gate_blocks_without_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .expect(0)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        let response = gateway.query_graphql("mutation { doThing }", Some("{}")).await;

        assert_eq!(response.get("isError"), Some(&Value::Bool(true)));
        assert_eq!(
            response.get("message").and_then(Value::as_str),
            Some(MUTATIONS_NOT_ALLOWED)
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn mutation_allowed_when_enabled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(r#"{"data":{"doThing":true}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), true);
        gateway.initialize().await.ok();
        let response = gateway.query_graphql("mutation { doThing }", None).await;

        assert_eq!(response, json!({"data": {"doThing": true}}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn query_issues_one_call_regardless_of_mutation_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(r#"{"data":{}}"#)
            .expect(1)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        gateway.query_graphql("query { things }", None).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn variables_default_to_empty_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_body(mockito::Matcher::Json(json!({
                "query": "query { things }",
                "variables": {},
            })))
            .with_status(200)
            .with_body(r#"{"data":{}}"#)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        gateway.query_graphql("query { things }", Some("")).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_variables_do_not_reach_the_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .expect(0)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        let response = gateway
            .query_graphql("query { things }", Some("not json"))
            .await;

        assert_eq!(response.get("isError"), Some(&Value::Bool(true)));
        assert_eq!(
            response.get("exceptionType").and_then(Value::as_str),
            Some("SerializationError")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn graphql_errors_pass_through_verbatim() {
        let body = r#"{"data":null,"errors":[{"message":"boom"}]}"#;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        let response = gateway.query_graphql("query { things }", None).await;

        assert_eq!(
            serde_json::from_str::<Value>(body).ok(),
            Some(response.clone())
        );
        assert_eq!(response.get("isError"), None);
    }

    #[tokio::test]
    async fn remote_failure_becomes_error_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/graphql")
            .with_status(500)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        let response = gateway.query_graphql("query { things }", None).await;

        assert_eq!(response.get("isError"), Some(&Value::Bool(true)));
        let message = response.get("message").and_then(Value::as_str);
        assert!(
            message.is_some_and(|m| m.starts_with("Failed to execute GraphQL query")),
            "unexpected message: {message:?}"
        );
        assert_eq!(
            response.get("exceptionType").and_then(Value::as_str),
            Some("RemoteError")
        );
    }

    #[tokio::test]
    async fn live_introspection_sends_query_document() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_body(mockito::Matcher::PartialJson(json!({
                "query": DEFAULT_INTROSPECTION_QUERY,
            })))
            .with_status(200)
            .with_body(r#"{"data":{"__schema":{"types":[]}}}"#)
            .create_async()
            .await;

        let mut gateway = gateway(&format!("{}/graphql", server.url()), false);
        gateway.initialize().await.ok();
        let schema = gateway.introspect_schema().await;

        assert_eq!(schema, json!({"data": {"__schema": {"types": []}}}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn local_schema_reads_file_without_network_call() {
        let path = std::env::temp_dir().join("gateway_local_schema_test.json");
        std::fs::write(&path, r#"{"data":{"__schema":{}}}"#).ok();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .expect(0)
            .create_async()
            .await;

        let mut gateway = GraphQLGateway::new(
            Url::parse(&format!("{}/graphql", server.url()))
                .unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            false,
            Some(path.clone()),
            "{}".to_string(),
            None,
            Arc::new(AuthClient::new(AuthConfig::default())),
            ErrorNormalizer::new(false),
        );
        gateway.initialize().await.ok();

        let first = gateway.introspect_schema().await;
        let second = gateway.introspect_schema().await;
        assert_eq!(first, json!({"data": {"__schema": {}}}));
        assert_eq!(first, second);
        mock.assert_async().await;

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn missing_local_schema_becomes_filesystem_payload() {
        let mut gateway = GraphQLGateway::new(
            Url::parse("http://127.0.0.1:1/graphql")
                .unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            false,
            Some(PathBuf::from("/does/not/exist.json")),
            "{}".to_string(),
            None,
            Arc::new(AuthClient::new(AuthConfig::default())),
            ErrorNormalizer::new(false),
        );
        gateway.initialize().await.ok();
        let response = gateway.introspect_schema().await;

        assert_eq!(response.get("isError"), Some(&Value::Bool(true)));
        assert_eq!(
            response.get("exceptionType").and_then(Value::as_str),
            Some("FilesystemError")
        );
        let message = response.get("message").and_then(Value::as_str);
        assert!(
            message.is_some_and(|m| m.starts_with("Failed to introspect schema")),
            "unexpected message: {message:?}"
        );
    }

    #[tokio::test]
    async fn eager_login_merges_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/login")
            .with_status(200)
            .with_body(r#"{"access_token":"abc123"}"#)
            .create_async()
            .await;

        let auth = Arc::new(AuthClient::new(AuthConfig {
            login_endpoint: Url::parse(&format!("{}/login", server.url())).ok(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        }));
        let mut gateway = GraphQLGateway::new(
            Url::parse(&format!("{}/graphql", server.url()))
                .unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            false,
            None,
            r#"{"X-Tenant":"acme","Authorization":"static-to-be-overridden"}"#.to_string(),
            None,
            auth,
            ErrorNormalizer::new(false),
        );
        gateway.initialize().await.ok();

        let headers = gateway.headers();
        assert_eq!(
            headers.get("Authorization").cloned(),
            Some(HeaderValue::from_static("Bearer abc123"))
        );
        assert_eq!(
            headers.get("X-Tenant").cloned(),
            Some(HeaderValue::from_static("acme"))
        );
    }

    #[tokio::test]
    async fn failed_eager_login_keeps_static_headers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/login")
            .with_status(503)
            .create_async()
            .await;

        let auth = Arc::new(AuthClient::new(AuthConfig {
            login_endpoint: Url::parse(&format!("{}/login", server.url())).ok(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        }));
        let mut gateway = GraphQLGateway::new(
            Url::parse(&format!("{}/graphql", server.url()))
                .unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            false,
            None,
            r#"{"X-Tenant":"acme"}"#.to_string(),
            None,
            auth,
            ErrorNormalizer::new(false),
        );
        assert!(gateway.initialize().await.is_ok());

        let headers = gateway.headers();
        assert_eq!(headers.get("Authorization"), None);
        assert_eq!(
            headers.get("X-Tenant").cloned(),
            Some(HeaderValue::from_static("acme"))
        );
    }

    #[tokio::test]
    async fn malformed_header_config_degrades_to_empty() {
        let mut gateway = GraphQLGateway::new(
            Url::parse("http://127.0.0.1:1/graphql")
                .unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            false,
            None,
            "not a json object".to_string(),
            None,
            Arc::new(AuthClient::new(AuthConfig::default())),
            ErrorNormalizer::new(false),
        );
        assert!(gateway.initialize().await.is_ok());
        assert!(gateway.headers().is_empty());
    }

    #[tokio::test]
    async fn missing_introspection_query_file_is_fatal() {
        let mut gateway = GraphQLGateway::new(
            Url::parse("http://127.0.0.1:1/graphql")
                .unwrap_or_else(|_| unreachable!("test endpoint is valid")),
            false,
            None,
            "{}".to_string(),
            Some(PathBuf::from("/does/not/exist.graphql")),
            Arc::new(AuthClient::new(AuthConfig::default())),
            ErrorNormalizer::new(false),
        );
        assert!(matches!(
            gateway.initialize().await,
            Err(ServerError::IntrospectionQuery { .. })
        ));
    }
}
