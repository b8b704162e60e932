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

/// The name of the tool to fetch the GraphQL schema
pub const INTROSPECT_SCHEMA_TOOL_NAME: &str = "introspect_schema";

#[derive(Clone)]
pub struct IntrospectSchema {
    gateway: Arc<GraphQLGateway>,
    pub tool: Tool,
}

/// Input for the introspect_schema tool.
#[derive(JsonSchema, Deserialize)]
pub struct Input {}

impl IntrospectSchema {
    pub fn new(gateway: Arc<GraphQLGateway>) -> Self {
        Self {
            gateway,
            tool: Tool::new(
                INTROSPECT_SCHEMA_TOOL_NAME,
                "Introspect the GraphQL schema. Use this tool before doing a query to get the schema information.",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self) -> Result<CallToolResult, McpError> {
        Ok(tool_result(self.gateway.introspect_schema().await))
    }
}
