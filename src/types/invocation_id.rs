//! Invocation identifier type using TypeID format.
//!
//! InvocationId tags every tool invocation passing through the gateway so that
//! results, log lines and provider calls can be correlated.
//! Format: `inv_01h455vb4pex5vsknk084sn02q`
//!
//! Every [`ToolInvocationResult`](crate::tools::ToolInvocationResult) carries
//! the id of its request. Batches and the `serve` loop run requests
//! concurrently and `serve` writes results in completion order, so the id is
//! the only reliable way for a planning runtime to pair a result with the
//! call it made. Callers may supply their own id; otherwise the registry
//! assigns one and the same value appears in the `invoke` tracing span.

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated identifier for a single tool invocation.
///
/// Uses TypeID format for human-readable, time-sortable, globally unique IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationId(MagicTypeId);

/// Error returned when attempting to parse an invalid invocation ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInvocationId {
    /// TypeID parsing failed
    Parse(String),
    /// Wrong prefix (expected "inv")
    WrongPrefix {
        /// The expected prefix
        expected: &'static str,
        /// The actual prefix found
        actual: String,
    },
}

impl fmt::Display for InvalidInvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "invalid invocation ID: {e}"),
            Self::WrongPrefix { expected, actual } => {
                write!(f, "expected prefix '{expected}', got '{actual}'")
            }
        }
    }
}

impl std::error::Error for InvalidInvocationId {}

impl InvocationId {
    /// The TypeID prefix for invocation identifiers.
    pub const PREFIX: &'static str = "inv";

    /// Creates a new invocation ID with a fresh UUIDv7 (time-sortable).
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// Parses an invocation ID from a string, validating the prefix.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInvocationId::Parse` if the string is not a valid TypeID.
    /// Returns `InvalidInvocationId::WrongPrefix` if the TypeID has a different prefix.
    pub fn parse(s: &str) -> Result<Self, InvalidInvocationId> {
        let id =
            MagicTypeId::from_str(s).map_err(|e| InvalidInvocationId::Parse(e.to_string()))?;

        let prefix = id.prefix().as_str();
        if prefix != Self::PREFIX {
            return Err(InvalidInvocationId::WrongPrefix {
                expected: Self::PREFIX,
                actual: prefix.to_string(),
            });
        }

        Ok(Self(id))
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InvocationId {
    type Err = InvalidInvocationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for InvocationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InvocationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_prefix() {
        assert!(InvocationId::new().to_string().starts_with("inv_"));
    }

    #[test]
    fn parse_accepts_generated_id() {
        let id = InvocationId::new();
        let parsed = InvocationId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_wrong_prefix_fails() {
        let result = InvocationId::parse("corr_01h455vb4pex5vsknk084sn02q");
        assert!(matches!(
            result,
            Err(InvalidInvocationId::WrongPrefix { expected: "inv", .. })
        ));
    }

    #[test]
    fn parse_garbage_fails() {
        assert!(matches!(
            InvocationId::parse("not-a-valid-typeid"),
            Err(InvalidInvocationId::Parse(_))
        ));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = InvocationId::new();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
