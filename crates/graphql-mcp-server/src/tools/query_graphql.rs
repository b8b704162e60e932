use super::tool_result;
use crate::errors::McpError;
use crate::gateway::GraphQLGateway;
use crate::schema_from_type;
use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::JsonSchema;
use rmcp::serde_json::Value;
use rmcp::{schemars, serde_json};
use serde::Deserialize;
use std::sync::Arc;

/// The name of the tool to execute an ad hoc GraphQL operation
pub const QUERY_GRAPHQL_TOOL_NAME: &str = "query_graphql";

#[derive(Clone)]
pub struct QueryGraphQL {
    gateway: Arc<GraphQLGateway>,
    pub tool: Tool,
}

/// Input for the query_graphql tool.
#[derive(JsonSchema, Deserialize)]
pub struct Input {
    /// The GraphQL query to execute
    pub query: String,

    /// The variable values as a JSON object string
    #[serde(default)]
    pub variables: Option<String>,
}

impl QueryGraphQL {
    pub fn new(gateway: Arc<GraphQLGateway>) -> Self {
        Self {
            gateway,
            tool: Tool::new(
                QUERY_GRAPHQL_TOOL_NAME,
                "Query a GraphQL endpoint with the given query and variables.",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, input: Input) -> Result<CallToolResult, McpError> {
        Ok(tool_result(
            self.gateway
                .query_graphql(&input.query, input.variables.as_deref())
                .await,
        ))
    }
}
