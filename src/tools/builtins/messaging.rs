//! Send message built-in tool.
//!
//! Sends an SMS, or an MMS when a media URL is given. All validation happens
//! before the provider is called, so a rejected request never results in a
//! message being sent.

use crate::logging::preview;
use crate::providers::{MessageReceipt, MessagingProvider, OutboundMessage};
use crate::tools::definition::{ToolDefinition, ToolDescriptor, ToolHandler};
use crate::tools::error::ToolError;
use crate::tools::schema::{ParamType, ParameterSchema, ParameterSpec};
use crate::types::PhoneNumber;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Longest accepted message body, in characters.
pub const MAX_BODY_LENGTH: usize = 1600;

/// Arguments for the send_message tool.
#[derive(Debug, Deserialize)]
pub struct SendMessageArgs {
    /// Recipient, E.164
    pub to: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Public http(s) URL of an image or other media to attach
    #[serde(default)]
    pub media_url: Option<String>,
}

/// Send message tool executor.
#[derive(Debug, Clone)]
pub struct MessagingTool {
    provider: Arc<dyn MessagingProvider>,
}

impl MessagingTool {
    pub const NAME: &'static str = "send_message";

    #[must_use]
    pub fn new(provider: Arc<dyn MessagingProvider>) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(ParameterSpec::required(
                "to",
                ParamType::String,
                "Recipient phone number in E.164 format, e.g. +14155550123",
            ))
            .with(
                ParameterSpec::optional(
                    "body",
                    ParamType::String,
                    "Message text. Required unless media_url is given.",
                )
                .with_max_length(MAX_BODY_LENGTH),
            )
            .with(ParameterSpec::optional(
                "media_url",
                ParamType::String,
                "Public http(s) URL of media to attach; sends an MMS",
            ))
    }

    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        let schema = Self::schema();
        ToolDescriptor::new(
            ToolDefinition::new(
                Self::NAME,
                "Send an SMS text message, or an MMS when media_url is given, to a phone number.",
                schema.to_json_schema(),
            ),
            schema,
            ToolHandler::SendMessage(self.clone()),
        )
    }

    /// Validates the request and hands it to the provider.
    ///
    /// # Errors
    ///
    /// `InvalidPhoneNumber` for a malformed recipient, `InvalidRequest` for an
    /// empty or oversized body or a bad media URL, `Provider` when the
    /// provider refuses or cannot be reached.
    pub async fn send(&self, args: SendMessageArgs) -> Result<MessageReceipt, ToolError> {
        let message = build_message(args)?;
        let receipt = self.provider.send_message(&message).await.map_err(|e| {
            tracing::warn!(to = %message.to.masked(), code = %e.code, error = %e.message, "message not sent");
            ToolError::from(e)
        })?;
        tracing::info!(
            to = %message.to.masked(),
            sid = %receipt.sid,
            status = %receipt.status,
            body = %preview(&message.body, 30),
            "message queued"
        );
        Ok(receipt)
    }
}

/// Turns raw arguments into a checked [`OutboundMessage`].
///
/// # Errors
///
/// See [`MessagingTool::send`].
pub fn build_message(args: SendMessageArgs) -> Result<OutboundMessage, ToolError> {
    let to = PhoneNumber::parse(&args.to)
        .map_err(|_| ToolError::invalid_phone_number(args.to.clone()))?;

    let media_url = match args.media_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_media_url(raw)?),
    };

    let body = args.body.unwrap_or_default();
    if body.trim().is_empty() && media_url.is_none() {
        return Err(ToolError::invalid_request(
            "message body must not be empty unless media_url is given",
        ));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(ToolError::invalid_request(format!(
            "message body exceeds {MAX_BODY_LENGTH} characters"
        )));
    }

    Ok(OutboundMessage {
        to,
        body,
        media_url,
    })
}

fn parse_media_url(raw: &str) -> Result<Url, ToolError> {
    let url = Url::parse(raw)
        .map_err(|e| ToolError::invalid_request(format!("media_url '{raw}' is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::invalid_request(format!(
            "media_url must use http or https, not '{other}'"
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderFuture};
    use crate::tools::error::ToolErrorKind;
    use std::sync::Mutex;

    /// Records messages and answers with a canned result.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingMessenger {
        pub sent: Mutex<Vec<OutboundMessage>>,
        pub fail_with: Option<ProviderError>,
    }

    impl MessagingProvider for RecordingMessenger {
        fn send_message<'a>(
            &'a self,
            message: &'a OutboundMessage,
        ) -> ProviderFuture<'a, MessageReceipt> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(message.clone());
                if let Some(error) = &self.fail_with {
                    return Err(error.clone());
                }
                Ok(MessageReceipt {
                    sid: "SM0001".to_string(),
                    status: "queued".to_string(),
                    to: message.to.to_string(),
                    from: "+14155550100".to_string(),
                    num_media: u32::from(message.media_url.is_some()),
                })
            })
        }
    }

    fn args(to: &str, body: Option<&str>, media_url: Option<&str>) -> SendMessageArgs {
        SendMessageArgs {
            to: to.to_string(),
            body: body.map(str::to_string),
            media_url: media_url.map(str::to_string),
        }
    }

    fn tool() -> (Arc<RecordingMessenger>, MessagingTool) {
        let provider = Arc::new(RecordingMessenger::default());
        (provider.clone(), MessagingTool::new(provider))
    }

    #[tokio::test]
    async fn sends_sms() {
        let (provider, tool) = tool();
        let receipt = tool
            .send(args("+14155550123", Some("hi"), None))
            .await
            .unwrap();
        assert_eq!(receipt.sid, "SM0001");
        assert_eq!(receipt.num_media, 0);

        let sent = provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "hi");
    }

    #[tokio::test]
    async fn sends_media_only_mms() {
        let (provider, tool) = tool();
        let receipt = tool
            .send(args("+14155550123", None, Some("https://example.com/cat.png")))
            .await
            .unwrap();
        assert_eq!(receipt.num_media, 1);
        assert!(provider.sent.lock().unwrap()[0].media_url.is_some());
    }

    #[tokio::test]
    async fn invalid_number_never_reaches_provider() {
        let (provider, tool) = tool();
        for to in [
            "not-a-number",
            "4155550123",
            "+1 415 555 0123",
            "",
            " +14155550123\n",
        ] {
            let err = tool.send(args(to, Some("hi"), None)).await.unwrap_err();
            assert!(
                matches!(err.kind(), ToolErrorKind::InvalidPhoneNumber { .. }),
                "{to:?} gave {err}"
            );
        }
        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_body_without_media_is_invalid() {
        let (provider, tool) = tool();
        for body in [None, Some(""), Some("   ")] {
            let err = tool.send(args("+14155550123", body, None)).await.unwrap_err();
            assert!(matches!(err.kind(), ToolErrorKind::InvalidRequest { .. }));
        }
        assert!(provider.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_media_url_is_invalid() {
        let (_provider, tool) = tool();
        for url in ["not a url", "ftp://example.com/a.png", "file:///etc/passwd"] {
            let err = tool
                .send(args("+14155550123", Some("hi"), Some(url)))
                .await
                .unwrap_err();
            assert!(matches!(err.kind(), ToolErrorKind::InvalidRequest { .. }), "{url}");
        }
    }

    #[tokio::test]
    async fn oversized_body_is_invalid() {
        let (_provider, tool) = tool();
        let body = "x".repeat(MAX_BODY_LENGTH + 1);
        let err = tool
            .send(args("+14155550123", Some(&body), None))
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ToolErrorKind::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped() {
        let provider = Arc::new(RecordingMessenger {
            fail_with: Some(ProviderError::new("21610", "recipient unsubscribed")),
            ..RecordingMessenger::default()
        });
        let tool = MessagingTool::new(provider.clone());
        let err = tool
            .send(args("+14155550123", Some("hi"), None))
            .await
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &ToolErrorKind::Provider {
                code: "21610".to_string(),
                message: "recipient unsubscribed".to_string()
            }
        );
        assert_eq!(provider.sent.lock().unwrap().len(), 1);
    }
}
