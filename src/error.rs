//! Process-level error types for toolgate.
//!
//! Tool failures never surface here; they are converted into structured
//! [`ToolInvocationResult`](crate::tools::ToolInvocationResult) values by the
//! registry. `GatewayError` covers what can go wrong while the gateway is being
//! assembled, where the only sensible reaction is to stop.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use std::fmt;

/// Errors that can occur while building or running the gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    /// The specific error that occurred
    pub kind: GatewayErrorKind,
}

/// Specific gateway error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Configuration is missing or invalid. Fatal at startup.
    Configuration {
        /// The configuration field at fault
        field: String,
        /// Why it was rejected
        reason: String,
    },
    /// A tool could not be registered during startup
    Registration {
        /// Reason for the failure
        reason: String,
    },
    /// Logging could not be initialized
    Logging {
        /// Reason for the failure
        reason: String,
    },
    /// An I/O error outside of tool execution (stdin/stdout, config files)
    Io {
        /// Description of the failure
        reason: String,
    },
}

impl GatewayError {
    /// Creates a new GatewayError with the given kind.
    #[must_use]
    pub fn new(kind: GatewayErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a registration error.
    #[must_use]
    pub fn registration(reason: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Registration {
            reason: reason.into(),
        })
    }

    /// Creates a logging error.
    #[must_use]
    pub fn logging(reason: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Logging {
            reason: reason.into(),
        })
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(reason: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Io {
            reason: reason.into(),
        })
    }

    /// Returns true if this error indicates a configuration problem.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, GatewayErrorKind::Configuration { .. })
    }

    /// Returns the configuration field at fault, if this is a configuration error.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            GatewayErrorKind::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GatewayErrorKind::Configuration { field, reason } => {
                write!(
                    f,
                    "configuration error for '{}': {}; fix the config file or environment and restart",
                    field, reason
                )
            }
            GatewayErrorKind::Registration { reason } => {
                write!(f, "tool registration failed: {}", reason)
            }
            GatewayErrorKind::Logging { reason } => {
                write!(f, "failed to initialize logging: {}", reason)
            }
            GatewayErrorKind::Io { reason } => {
                write!(f, "I/O error: {}", reason)
            }
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}
