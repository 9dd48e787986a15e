//! Messaging and voice providers.
//!
//! The telephony tools talk to the outside world through two narrow traits,
//! [`MessagingProvider`] and [`VoiceProvider`]. [`TwilioClient`] implements
//! both over the Twilio REST API; tests substitute in-process fakes.
//!
//! Provider calls are never retried: a message or call that the provider
//! accepted cannot be recalled, so a retry risks a duplicate.

mod twilio;

pub use twilio::{
    call_form, calls_url, error_from_response, message_form, messages_url, TwilioClient,
};

use crate::tools::error::ToolError;
use crate::types::PhoneNumber;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Boxed future returned by provider calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// A failure reported by, or on the way to, a provider.
///
/// `code` is the provider's own error code when it sent one, otherwise
/// `http_<status>`, `transport`, `timeout` or `invalid_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new("timeout", message)
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new("transport", message)
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.code == "timeout"
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for ToolError {
    fn from(error: ProviderError) -> Self {
        ToolError::provider(error.code, error.message)
    }
}

/// An SMS, or an MMS when `media_url` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: PhoneNumber,
    /// May be empty only when `media_url` is set
    pub body: String,
    pub media_url: Option<Url>,
}

/// What the callee hears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallInstructions {
    /// A URL the provider fetches TwiML from
    Url(Url),
    /// An inline TwiML document
    Twiml(String),
}

/// An outbound voice call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub to: PhoneNumber,
    pub instructions: CallInstructions,
}

/// The provider's acknowledgement of a queued message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Provider message id
    pub sid: String,
    pub status: String,
    pub to: String,
    pub from: String,
    pub num_media: u32,
}

/// The provider's acknowledgement of a queued call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReceipt {
    /// Provider call id
    pub sid: String,
    pub status: String,
    pub to: String,
    pub from: String,
}

/// Sends SMS and MMS messages.
pub trait MessagingProvider: Send + Sync + Debug {
    fn send_message<'a>(&'a self, message: &'a OutboundMessage) -> ProviderFuture<'a, MessageReceipt>;
}

/// Places outbound voice calls.
pub trait VoiceProvider: Send + Sync + Debug {
    fn place_call<'a>(&'a self, call: &'a OutboundCall) -> ProviderFuture<'a, CallReceipt>;
}
