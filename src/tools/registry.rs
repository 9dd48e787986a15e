//! Tool registry.
//!
//! The registry maps stable tool names to descriptors. It is filled once at
//! startup and then only read, so it can be shared behind an `Arc` and
//! invoked from many tasks at once without locking. Every invocation yields a
//! [`ToolInvocationResult`]; no error or panic from a tool escapes.

use crate::tools::definition::{ToolDefinition, ToolDescriptor};
use crate::tools::error::ToolError;
use crate::tools::invocation::{ToolInvocationRequest, ToolInvocationResult};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::Instrument;

/// Longest accepted tool name.
pub const MAX_TOOL_NAME_LENGTH: usize = 64;

/// Invocation counters.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    requested: AtomicU64,
    succeeded: AtomicU64,
    /// The tool ran and returned an error
    failed: AtomicU64,
    /// Unknown tool or invalid arguments; the tool never ran
    rejected: AtomicU64,
}

/// Point-in-time copy of [`RegistryMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requested: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
}

impl RegistryMetrics {
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requested: self.requested.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Registered tools, keyed by name.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    metrics: RegistryMetrics,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if a tool with the same name is already registered,
    /// `InvalidRequest` if the name is empty, too long, or contains anything
    /// but ASCII letters, digits, `_` and `-`.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), ToolError> {
        let name = descriptor.name().to_string();
        validate_name(&name)?;

        if self.tools.contains_key(&name) {
            tracing::error!(tool_name = %name, "tool registration failed: duplicate name");
            return Err(ToolError::duplicate_name(name));
        }

        tracing::debug!(tool_name = %name, handler = descriptor.handler().kind(), "tool registered");
        self.tools.insert(name, descriptor);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    #[must_use]
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Definitions for the planning runtime, sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|d| d.definition().clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Runs one invocation and reports how it went.
    ///
    /// Lookup, argument validation and execution failures all come back as
    /// an error result. Nothing is retried.
    pub async fn invoke(&self, request: ToolInvocationRequest) -> ToolInvocationResult {
        let started = Instant::now();
        let invocation_id = request.invocation_id.unwrap_or_default();
        let tool_name = request.tool;
        self.metrics.requested.fetch_add(1, Ordering::Relaxed);

        let span = tracing::info_span!(
            "invoke",
            tool_name = %tool_name,
            invocation_id = %invocation_id
        );
        let outcome = self
            .dispatch(&tool_name, request.arguments)
            .instrument(span.clone())
            .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let _entered = span.enter();
        match outcome {
            Ok(payload) => {
                self.metrics.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(elapsed_ms, "tool succeeded");
                ToolInvocationResult::success(invocation_id, tool_name, elapsed_ms, payload)
            }
            Err(Rejection::Rejected(error)) => {
                self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(elapsed_ms, code = error.code(), error = %error, "invocation rejected");
                ToolInvocationResult::error(invocation_id, tool_name, elapsed_ms, error)
            }
            Err(Rejection::Failed(error)) => {
                self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                if error.is_caller_error() || error.is_not_found() {
                    tracing::warn!(elapsed_ms, code = error.code(), error = %error, "tool refused request");
                } else {
                    tracing::error!(elapsed_ms, code = error.code(), error = %error, "tool failed");
                }
                ToolInvocationResult::error(invocation_id, tool_name, elapsed_ms, error)
            }
        }
    }

    /// Runs a batch concurrently. Results come back in request order.
    pub async fn invoke_all(&self, requests: Vec<ToolInvocationRequest>) -> Vec<ToolInvocationResult> {
        join_all(requests.into_iter().map(|r| self.invoke(r))).await
    }

    async fn dispatch(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, Rejection> {
        let descriptor = self
            .tools
            .get(tool_name)
            .ok_or_else(|| Rejection::Rejected(ToolError::unknown_tool(tool_name)))?;

        descriptor.schema().validate(&arguments).map_err(|fields| {
            Rejection::Rejected(ToolError::argument_validation(tool_name, fields))
        })?;

        tracing::debug!("executing tool");
        AssertUnwindSafe(descriptor.handler().execute(tool_name, arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ToolError::execution(tool_name, "tool panicked")))
            .map_err(Rejection::Failed)
    }
}

enum Rejection {
    Rejected(ToolError),
    Failed(ToolError),
}

fn validate_name(name: &str) -> Result<(), ToolError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_TOOL_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ToolError::invalid_request(format!(
            "tool name '{name}' must be 1-{MAX_TOOL_NAME_LENGTH} ASCII letters, digits, '_' or '-'"
        )))
    }
}
