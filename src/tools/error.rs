//! Tool error types.
//!
//! Every failure a tool or the registry can produce is a [`ToolError`]. The
//! registry never lets one escape as a Rust error to the planning runtime: it
//! is folded into a [`ToolInvocationResult`](super::ToolInvocationResult) whose
//! `error.kind` is the stable string returned by [`ToolErrorKind::code`].

use crate::tools::schema::FieldError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Errors that can occur in tool operations.
///
/// This type uses `Box<ToolErrorKind>` to keep the error size small,
/// enabling efficient use in Result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    kind: Box<ToolErrorKind>,
}

/// Specific tool error types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// A file path resolved outside the sandbox base directory
    PathEscape {
        /// The path as supplied by the caller
        path: String,
    },
    /// The target file does not exist
    NotFound {
        /// The path as supplied by the caller
        path: String,
    },
    /// The expression contains something outside the arithmetic grammar
    InvalidExpression {
        /// The rejected expression
        expression: String,
        /// What was wrong with it
        reason: String,
    },
    /// The expression divides by zero
    DivisionByZero {
        /// The rejected expression
        expression: String,
    },
    /// A phone number is not in E.164 format
    InvalidPhoneNumber {
        /// The rejected number
        number: String,
    },
    /// The request is well-typed but semantically unusable
    InvalidRequest {
        /// What was wrong with it
        reason: String,
    },
    /// The external messaging or voice provider failed
    #[serde(rename = "provider_error")]
    Provider {
        /// Provider error code, `timeout`, or `transport`
        code: String,
        /// Provider-supplied message
        #[serde(rename = "provider_message")]
        message: String,
    },
    /// No tool is registered under the requested name
    UnknownTool {
        /// The requested name
        tool_name: String,
    },
    /// The arguments do not match the tool's parameter schema
    ArgumentValidation {
        /// The tool whose schema was violated
        tool_name: String,
        /// Every offending field
        fields: Vec<FieldError>,
    },
    /// A tool with this name is already registered
    DuplicateName {
        /// The contested name
        tool_name: String,
    },
    /// A local operation failed for a reason none of the other kinds cover
    #[serde(rename = "execution_failed")]
    Execution {
        /// The tool that failed
        tool_name: String,
        /// Reason for failure
        reason: String,
    },
}

impl ToolErrorKind {
    /// Returns the stable wire name of this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathEscape { .. } => "path_escape",
            Self::NotFound { .. } => "not_found",
            Self::InvalidExpression { .. } => "invalid_expression",
            Self::DivisionByZero { .. } => "division_by_zero",
            Self::InvalidPhoneNumber { .. } => "invalid_phone_number",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Provider { .. } => "provider_error",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::ArgumentValidation { .. } => "argument_validation",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::Execution { .. } => "execution_failed",
        }
    }
}

impl ToolError {
    /// Creates a new ToolError with the given kind.
    #[must_use]
    pub fn new(kind: ToolErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &ToolErrorKind {
        &self.kind
    }

    /// Returns the stable wire name of the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Creates a path escape error.
    #[must_use]
    pub fn path_escape(path: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::PathEscape { path: path.into() })
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound { path: path.into() })
    }

    /// Creates an invalid expression error.
    #[must_use]
    pub fn invalid_expression(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidExpression {
            expression: expression.into(),
            reason: reason.into(),
        })
    }

    /// Creates a division by zero error.
    #[must_use]
    pub fn division_by_zero(expression: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::DivisionByZero {
            expression: expression.into(),
        })
    }

    /// Creates an invalid phone number error.
    #[must_use]
    pub fn invalid_phone_number(number: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidPhoneNumber {
            number: number.into(),
        })
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidRequest {
            reason: reason.into(),
        })
    }

    /// Creates a provider error.
    #[must_use]
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Provider {
            code: code.into(),
            message: message.into(),
        })
    }

    /// Creates an unknown tool error.
    #[must_use]
    pub fn unknown_tool(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::UnknownTool {
            tool_name: tool_name.into(),
        })
    }

    /// Creates an argument validation error.
    #[must_use]
    pub fn argument_validation(tool_name: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self::new(ToolErrorKind::ArgumentValidation {
            tool_name: tool_name.into(),
            fields,
        })
    }

    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate_name(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::DuplicateName {
            tool_name: tool_name.into(),
        })
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Execution {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Returns true if the caller can fix this by changing its arguments.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            *self.kind,
            ToolErrorKind::PathEscape { .. }
                | ToolErrorKind::InvalidExpression { .. }
                | ToolErrorKind::DivisionByZero { .. }
                | ToolErrorKind::InvalidPhoneNumber { .. }
                | ToolErrorKind::InvalidRequest { .. }
                | ToolErrorKind::UnknownTool { .. }
                | ToolErrorKind::ArgumentValidation { .. }
        )
    }

    /// Returns true if this error came from an external provider.
    #[must_use]
    pub fn is_provider(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::Provider { .. })
    }

    /// Returns true if this error indicates a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::NotFound { .. })
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            ToolErrorKind::PathEscape { path } => {
                write!(
                    f,
                    "path '{}' resolves outside the sandbox directory; use a path relative to the sandbox without '..'",
                    path
                )
            }
            ToolErrorKind::NotFound { path } => {
                write!(f, "file '{}' does not exist in the sandbox directory", path)
            }
            ToolErrorKind::InvalidExpression { expression, reason } => {
                write!(
                    f,
                    "invalid expression '{}': {}; only numbers, + - * / ** and parentheses are allowed",
                    expression, reason
                )
            }
            ToolErrorKind::DivisionByZero { expression } => {
                write!(f, "division by zero in expression '{}'", expression)
            }
            ToolErrorKind::InvalidPhoneNumber { number } => {
                write!(
                    f,
                    "'{}' is not a valid phone number; use E.164 format such as +14155550123",
                    number
                )
            }
            ToolErrorKind::InvalidRequest { reason } => {
                write!(f, "invalid request: {}", reason)
            }
            ToolErrorKind::Provider { code, message } => {
                write!(f, "provider error [{}]: {}", code, message)
            }
            ToolErrorKind::UnknownTool { tool_name } => {
                write!(
                    f,
                    "tool '{}' not found; list the available tools and use one of their names",
                    tool_name
                )
            }
            ToolErrorKind::ArgumentValidation { tool_name, fields } => {
                let details: Vec<String> = fields.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "tool '{}' argument validation failed: {}; check the input arguments",
                    tool_name,
                    details.join("; ")
                )
            }
            ToolErrorKind::DuplicateName { tool_name } => {
                write!(
                    f,
                    "tool '{}' is already registered; use a different name",
                    tool_name
                )
            }
            ToolErrorKind::Execution { tool_name, reason } => {
                write!(f, "tool '{}' execution failed: {}", tool_name, reason)
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Serialized as the kind's fields tagged with `kind`, plus a human-readable `message`.
impl Serialize for ToolError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(flatten)]
            kind: &'a ToolErrorKind,
            message: String,
        }

        Wire {
            kind: &self.kind,
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::FieldProblem;
    use serde_json::json;

    #[test]
    fn path_escape_display() {
        let error = ToolError::path_escape("../etc/passwd");
        let message = error.to_string();
        assert!(message.contains("../etc/passwd"));
        assert!(message.contains("outside the sandbox"));
    }

    #[test]
    fn unknown_tool_display() {
        let error = ToolError::unknown_tool("launch_rocket");
        assert!(error.to_string().contains("launch_rocket"));
        assert!(error.to_string().contains("not found"));
    }

    #[test]
    fn argument_validation_lists_every_field() {
        let error = ToolError::argument_validation(
            "write_file",
            vec![
                FieldError::new("path", FieldProblem::Missing),
                FieldError::new(
                    "content",
                    FieldProblem::WrongType {
                        expected: "string".to_string(),
                        found: "number".to_string(),
                    },
                ),
            ],
        );
        let message = error.to_string();
        assert!(message.contains("write_file"));
        assert!(message.contains("path"));
        assert!(message.contains("content"));
    }

    #[test]
    fn provider_display_includes_code() {
        let error = ToolError::provider("21211", "The 'To' number is not valid");
        assert!(error.to_string().contains("[21211]"));
        assert!(error.is_provider());
        assert!(!error.is_caller_error());
    }

    #[test]
    fn codes_are_stable() {
        let cases = [
            (ToolError::path_escape("p"), "path_escape"),
            (ToolError::not_found("p"), "not_found"),
            (ToolError::invalid_expression("e", "r"), "invalid_expression"),
            (ToolError::division_by_zero("1/0"), "division_by_zero"),
            (ToolError::invalid_phone_number("n"), "invalid_phone_number"),
            (ToolError::invalid_request("r"), "invalid_request"),
            (ToolError::provider("c", "m"), "provider_error"),
            (ToolError::unknown_tool("t"), "unknown_tool"),
            (ToolError::argument_validation("t", vec![]), "argument_validation"),
            (ToolError::duplicate_name("t"), "duplicate_name"),
            (ToolError::execution("t", "r"), "execution_failed"),
        ];
        for (error, code) in cases {
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn serde_tag_matches_code() {
        let error = ToolError::provider("timeout", "no response within 20s");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], json!(error.code()));
        assert_eq!(value["code"], json!("timeout"));
        assert_eq!(value["provider_message"], json!("no response within 20s"));
        assert!(value["message"].as_str().unwrap().contains("timeout"));

        let error = ToolError::execution("read_file", "permission denied");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], json!("execution_failed"));
    }

    #[test]
    fn caller_errors_classified() {
        assert!(ToolError::invalid_phone_number("x").is_caller_error());
        assert!(ToolError::division_by_zero("1/0").is_caller_error());
        assert!(!ToolError::not_found("a.txt").is_caller_error());
        assert!(ToolError::not_found("a.txt").is_not_found());
    }

    #[test]
    fn errors_are_clone_and_eq() {
        let a = ToolError::unknown_tool("x");
        assert_eq!(a.clone(), a);
        assert_ne!(a, ToolError::unknown_tool("y"));
    }
}
