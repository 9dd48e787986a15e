//! Tool system.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                        ToolRegistry                           |
//! |                                                               |
//! |  invoke(request)                                              |
//! |    1. look up name          --> UnknownTool                   |
//! |    2. ParameterSchema check --> ArgumentValidation            |
//! |    3. ToolHandler::execute  --> tool error or payload         |
//! |    -> ToolInvocationResult {status, payload | error}          |
//! +---------------------------------------------------------------+
//!              |                 |                  |
//!        CalculateTool      FileIoTool        MessagingTool / VoiceTool
//!                         (SandboxRoot)       (MessagingProvider / VoiceProvider)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolgate::tools::{ToolInvocationRequest, ToolRegistry};
//! use toolgate::tools::builtins::CalculateTool;
//! use serde_json::json;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(CalculateTool::new().descriptor())?;
//!
//! let result = registry
//!     .invoke(ToolInvocationRequest::new("calculate", json!({"expression": "2 ** 8"})))
//!     .await;
//! assert!(result.is_success());
//! ```

pub mod builtins;
pub mod definition;
pub mod error;
pub mod invocation;
pub mod registry;
pub mod schema;
pub mod security;

pub use definition::{ToolDefinition, ToolDescriptor, ToolHandler};
pub use error::{ToolError, ToolErrorKind};
pub use invocation::{InvocationOutcome, ToolInvocationRequest, ToolInvocationResult};
pub use registry::{MetricsSnapshot, RegistryMetrics, ToolRegistry};
pub use schema::{FieldError, FieldProblem, ParamType, ParameterSchema, ParameterSpec};
pub use security::{ResolvedPath, SandboxRoot};
