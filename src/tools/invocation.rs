//! Invocation request and result types.
//!
//! These are the only two shapes exchanged with the planning runtime. A
//! result is always well formed: failures are carried in it, never raised.

use crate::tools::error::ToolError;
use crate::types::InvocationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool call requested by the planning runtime.
///
/// ```json
/// {"tool": "calculate", "arguments": {"expression": "(2+3)*4"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Assigned by the registry when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<InvocationId>,
    #[serde(alias = "name")]
    pub tool: String,
    /// Argument object; a missing value is treated as `{}`
    #[serde(default, alias = "args")]
    pub arguments: Value,
}

impl ToolInvocationRequest {
    #[must_use]
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            invocation_id: None,
            tool: tool.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn with_invocation_id(mut self, id: InvocationId) -> Self {
        self.invocation_id = Some(id);
        self
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success { payload: Value },
    Error { error: ToolError },
}

/// The result handed back for every invocation.
///
/// Serialized flat:
///
/// ```json
/// {"invocation_id": "inv_…", "tool_name": "calculate", "elapsed_ms": 0,
///  "status": "success", "payload": {"result": 20.0, …}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocationResult {
    pub invocation_id: InvocationId,
    pub tool_name: String,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: InvocationOutcome,
}

impl ToolInvocationResult {
    #[must_use]
    pub fn success(
        invocation_id: InvocationId,
        tool_name: impl Into<String>,
        elapsed_ms: u64,
        payload: Value,
    ) -> Self {
        Self {
            invocation_id,
            tool_name: tool_name.into(),
            elapsed_ms,
            outcome: InvocationOutcome::Success { payload },
        }
    }

    #[must_use]
    pub fn error(
        invocation_id: InvocationId,
        tool_name: impl Into<String>,
        elapsed_ms: u64,
        error: ToolError,
    ) -> Self {
        Self {
            invocation_id,
            tool_name: tool_name.into(),
            elapsed_ms,
            outcome: InvocationOutcome::Error { error },
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success { .. })
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            InvocationOutcome::Success { payload } => Some(payload),
            InvocationOutcome::Error { .. } => None,
        }
    }

    #[must_use]
    pub fn error_ref(&self) -> Option<&ToolError> {
        match &self.outcome {
            InvocationOutcome::Success { .. } => None,
            InvocationOutcome::Error { error } => Some(error),
        }
    }

    /// The stable error kind, e.g. `"unknown_tool"`.
    #[must_use]
    pub fn error_code(&self) -> Option<&'static str> {
        self.error_ref().map(ToolError::code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_missing_arguments() {
        let request: ToolInvocationRequest =
            serde_json::from_str(r#"{"tool": "read_file"}"#).unwrap();
        assert_eq!(request.tool, "read_file");
        assert!(request.arguments.is_null());
        assert!(request.invocation_id.is_none());
    }

    #[test]
    fn request_accepts_aliases() {
        let request: ToolInvocationRequest =
            serde_json::from_str(r#"{"name": "calculate", "args": {"expression": "1+1"}}"#)
                .unwrap();
        assert_eq!(request.tool, "calculate");
        assert_eq!(request.arguments["expression"], "1+1");
    }

    #[test]
    fn request_carries_supplied_id() {
        let id = InvocationId::new();
        let json = json!({"invocation_id": id.to_string(), "tool": "calculate"});
        let request: ToolInvocationRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.invocation_id, Some(id));
    }

    #[test]
    fn success_serializes_flat() {
        let result = ToolInvocationResult::success(
            InvocationId::new(),
            "calculate",
            3,
            json!({"result": 20.0}),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["tool_name"], "calculate");
        assert_eq!(value["elapsed_ms"], 3);
        assert_eq!(value["payload"]["result"], 20.0);
        assert!(value["invocation_id"].as_str().unwrap().starts_with("inv_"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_serializes_kind_and_message() {
        let result = ToolInvocationResult::error(
            InvocationId::new(),
            "send_message",
            0,
            ToolError::invalid_phone_number("not-a-number"),
        );
        assert!(!result.is_success());
        assert_eq!(result.error_code(), Some("invalid_phone_number"));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["kind"], "invalid_phone_number");
        assert_eq!(value["error"]["number"], "not-a-number");
        assert!(value["error"]["message"].as_str().unwrap().contains("not-a-number"));
        assert!(value.get("payload").is_none());
    }
}
