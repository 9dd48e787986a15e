//! E.164 phone number type.
//!
//! Both telephony tools and the configured sender number go through
//! [`PhoneNumber::parse`], so a value of this type is always dialable
//! in the `+<country><subscriber>` form the provider expects.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn e164() -> &'static Regex {
    static E164: OnceLock<Regex> = OnceLock::new();
    E164.get_or_init(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("E.164 pattern is valid"))
}

/// A phone number in E.164 format, e.g. `+14155550123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

/// Error returned when a string is not an E.164 phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPhoneNumber {
    /// The rejected input
    pub input: String,
}

impl fmt::Display for InvalidPhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not an E.164 phone number; expected '+' followed by 2 to 15 digits, e.g. +14155550123",
            self.input
        )
    }
}

impl std::error::Error for InvalidPhoneNumber {}

impl PhoneNumber {
    /// Parses and validates a phone number.
    ///
    /// No normalization is attempted: spaces, dashes and parentheses are
    /// rejected rather than stripped, since guessing at a number that will be
    /// dialed is worse than asking the caller to fix it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPhoneNumber` if the input is not strictly E.164.
    pub fn parse(s: &str) -> Result<Self, InvalidPhoneNumber> {
        if e164().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidPhoneNumber {
                input: s.to_string(),
            })
        }
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number with all but the last four digits masked, for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let digits = self.0.len() - 1;
        let visible = digits.min(4);
        format!("+{}{}", "*".repeat(digits - visible), &self.0[self.0.len() - visible..])
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = InvalidPhoneNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PhoneNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
