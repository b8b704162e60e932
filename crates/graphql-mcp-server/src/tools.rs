//! The MCP tool surface over the gateway.

pub mod introspect_schema;
pub mod query_graphql;

use rmcp::model::{CallToolResult, Content};
use rmcp::serde_json::Value;

/// Wrap a gateway result value as a tool call result. The error flag mirrors
/// the `isError` field of the returned payload; remote GraphQL envelopes never
/// set it.
fn tool_result(value: Value) -> CallToolResult {
    let is_error = value
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or_default();
    CallToolResult {
        content: vec![Content::json(&value).unwrap_or(Content::text(value.to_string()))],
        is_error: Some(is_error),
    }
}
