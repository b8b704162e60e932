pub mod auth;
pub mod error_payload;
pub mod errors;
pub mod gateway;
pub mod json_schema;
pub mod runtime;
pub mod server;
pub mod tools;
