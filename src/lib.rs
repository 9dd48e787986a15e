//! # toolgate: capability-scoped tool gateway
//!
//! toolgate exposes a fixed set of tools to an LLM planning runtime and runs
//! the invocations it requests, enforcing each tool's safety boundary.
//!
//! ## Architecture
//!
//! - **Gateway**: application context built once from configuration
//! - **Tool Registry**: name lookup, argument validation, concurrent dispatch
//! - **Built-in Tools**: `calculate`, sandboxed file I/O, `send_message`, `make_call`
//! - **Providers**: telephony backends behind traits (Twilio by default)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use toolgate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GatewayError> {
//!     let gateway = Gateway::from_config(toolgate::config::resolve(None)?)?;
//!     let result = gateway
//!         .invoke(ToolInvocationRequest::new("calculate", json!({"expression": "2 ** 8"})))
//!         .await;
//!     println!("{}", serde_json::to_string(&result).unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod providers;
pub mod tools;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AppendPolicy, GatewayConfig};
    pub use crate::error::{GatewayError, GatewayErrorKind};
    pub use crate::gateway::{AgentManifest, Gateway, GatewayBuilder};
    pub use crate::logging::{init_logging, LogLevel, LoggingConfig, LoggingGuard};
    pub use crate::providers::{
        MessagingProvider, ProviderError, TwilioClient, VoiceProvider,
    };
    pub use crate::tools::{
        InvocationOutcome, ToolDefinition, ToolError, ToolErrorKind, ToolInvocationRequest,
        ToolInvocationResult, ToolRegistry,
    };
    pub use crate::types::{InvocationId, PhoneNumber};

    pub use serde_json::json;
}
