//! Uniform error payloads returned across the tool boundary.
//!
//! The two public gateway operations never fail upward; every fault is
//! collapsed into one of these payloads so the calling framework always
//! receives a well-formed value.

use crate::errors::Fault;
use rmcp::serde_json::{self, Value, json};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::collections::HashMap;

/// The number of backtrace frames included in debug-mode payloads.
const MAX_TRACE_FRAMES: usize = 5;

/// The error shape returned to callers, with `isError` always set.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub is_error: bool,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<HashMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ErrorPayload {
    pub fn into_value(self) -> Value {
        let message = self.message.clone();
        serde_json::to_value(self).unwrap_or_else(|_| {
            json!({
                "isError": true,
                "message": message,
            })
        })
    }
}

/// Builds [`ErrorPayload`] values from a message and an optional underlying
/// fault. Construction never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorNormalizer {
    debug: bool,
}

impl ErrorNormalizer {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn create_error(&self, message: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            is_error: true,
            message: message.into(),
            exception_type: None,
            stack_trace: None,
            validation_errors: None,
            error_type: None,
        }
    }

    pub fn create_error_with(&self, message: &str, fault: &impl Fault) -> ErrorPayload {
        ErrorPayload {
            is_error: true,
            message: format!("{message}: {fault}"),
            exception_type: Some(fault.kind_name().to_string()),
            stack_trace: self.debug.then(capture_trace),
            validation_errors: None,
            error_type: None,
        }
    }

    pub fn create_validation_error(
        &self,
        message: impl Into<String>,
        validation_errors: HashMap<String, String>,
    ) -> ErrorPayload {
        ErrorPayload {
            validation_errors: Some(validation_errors),
            ..self.create_error(message)
        }
    }

    pub fn create_auth_error(&self, message: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            error_type: Some("AuthenticationError".to_string()),
            ..self.create_error(message)
        }
    }
}

/// Capture the first [`MAX_TRACE_FRAMES`] frames of the current backtrace as a
/// newline-joined string. Frame header lines look like `  3: some::symbol`;
/// their following `at file:line` lines are kept with the frame they belong to.
fn capture_trace() -> String {
    let backtrace = Backtrace::force_capture().to_string();
    let mut frames = 0;
    let mut lines = Vec::new();
    for line in backtrace.lines() {
        if is_frame_header(line) {
            frames += 1;
            if frames > MAX_TRACE_FRAMES {
                break;
            }
        }
        if frames > 0 {
            lines.push(line.trim_start());
        }
    }
    lines.join("\n")
}

fn is_frame_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed
        .split_once(':')
        .is_some_and(|(index, _)| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
}
