//! Make call built-in tool.
//!
//! Places an outbound call. The optional `message` is interpreted as
//! follows:
//!
//! - absent or blank: the configured default voice URL is used
//! - an `http(s)://` URL: the provider fetches TwiML from it
//! - a document starting with `<`: sent as inline TwiML
//! - anything else: spoken as text
//!
//! Calls are real side effects and are never retried automatically.

use crate::providers::{CallInstructions, CallReceipt, OutboundCall, VoiceProvider};
use crate::tools::definition::{ToolDefinition, ToolDescriptor, ToolHandler};
use crate::tools::error::ToolError;
use crate::tools::schema::{ParamType, ParameterSchema, ParameterSpec};
use crate::types::PhoneNumber;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Longest accepted call message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Arguments for the make_call tool.
#[derive(Debug, Deserialize)]
pub struct MakeCallArgs {
    /// Callee, E.164
    pub to: String,
    /// Text to speak, a TwiML document, or a TwiML URL
    #[serde(default)]
    pub message: Option<String>,
}

/// Make call tool executor.
#[derive(Debug, Clone)]
pub struct VoiceTool {
    provider: Arc<dyn VoiceProvider>,
    default_voice_url: Url,
}

impl VoiceTool {
    pub const NAME: &'static str = "make_call";

    #[must_use]
    pub fn new(provider: Arc<dyn VoiceProvider>, default_voice_url: Url) -> Self {
        Self {
            provider,
            default_voice_url,
        }
    }

    #[must_use]
    pub fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with(ParameterSpec::required(
                "to",
                ParamType::String,
                "Phone number to call in E.164 format, e.g. +14155550123",
            ))
            .with(
                ParameterSpec::optional(
                    "message",
                    ParamType::String,
                    "What the callee hears: plain text to speak, a TwiML document, or a TwiML URL. Omit for the default greeting.",
                )
                .with_max_length(MAX_MESSAGE_LENGTH),
            )
    }

    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        let schema = Self::schema();
        ToolDescriptor::new(
            ToolDefinition::new(
                Self::NAME,
                "Place a voice call to a phone number and speak a message or play TwiML.",
                schema.to_json_schema(),
            ),
            schema,
            ToolHandler::MakeCall(self.clone()),
        )
    }

    /// Validates the request and hands it to the provider.
    ///
    /// # Errors
    ///
    /// `InvalidPhoneNumber` for a malformed callee, `InvalidRequest` for an
    /// oversized message or malformed TwiML, `Provider` when the provider
    /// refuses or cannot be reached.
    pub async fn call(&self, args: MakeCallArgs) -> Result<CallReceipt, ToolError> {
        let to = PhoneNumber::parse(&args.to)
            .map_err(|_| ToolError::invalid_phone_number(args.to.clone()))?;
        let instructions = call_instructions(args.message.as_deref(), &self.default_voice_url)?;
        let call = OutboundCall { to, instructions };

        let receipt = self.provider.place_call(&call).await.map_err(|e| {
            tracing::warn!(to = %call.to.masked(), code = %e.code, error = %e.message, "call not placed");
            ToolError::from(e)
        })?;
        tracing::info!(to = %call.to.masked(), sid = %receipt.sid, status = %receipt.status, "call queued");
        Ok(receipt)
    }
}

/// Decides how the provider should obtain the call script.
///
/// # Errors
///
/// `InvalidRequest` for a message over [`MAX_MESSAGE_LENGTH`] characters or
/// inline TwiML without a `<Response>` root.
pub fn call_instructions(
    message: Option<&str>,
    default_voice_url: &Url,
) -> Result<CallInstructions, ToolError> {
    let message = match message.map(str::trim) {
        None | Some("") => return Ok(CallInstructions::Url(default_voice_url.clone())),
        Some(m) => m,
    };

    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ToolError::invalid_request(format!(
            "call message exceeds {MAX_MESSAGE_LENGTH} characters"
        )));
    }

    if message.starts_with('<') {
        if !message.contains("<Response") {
            return Err(ToolError::invalid_request(
                "TwiML must have a <Response> root element",
            ));
        }
        return Ok(CallInstructions::Twiml(message.to_string()));
    }

    let looks_like_url = (message.starts_with("http://") || message.starts_with("https://"))
        && !message.contains(char::is_whitespace);
    if looks_like_url {
        if let Ok(url) = Url::parse(message) {
            return Ok(CallInstructions::Url(url));
        }
    }

    Ok(CallInstructions::Twiml(say_twiml(message)))
}

/// Wraps plain text in a TwiML `<Say>` document.
#[must_use]
pub fn say_twiml(text: &str) -> String {
    format!("<Response><Say>{}</Say></Response>", xml_escape(text))
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderFuture};
    use crate::tools::error::ToolErrorKind;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingDialer {
        pub placed: Mutex<Vec<OutboundCall>>,
        pub fail_with: Option<ProviderError>,
    }

    impl VoiceProvider for RecordingDialer {
        fn place_call<'a>(&'a self, call: &'a OutboundCall) -> ProviderFuture<'a, CallReceipt> {
            Box::pin(async move {
                self.placed.lock().unwrap().push(call.clone());
                if let Some(error) = &self.fail_with {
                    return Err(error.clone());
                }
                Ok(CallReceipt {
                    sid: "CA0001".to_string(),
                    status: "queued".to_string(),
                    to: call.to.to_string(),
                    from: "+14155550100".to_string(),
                })
            })
        }
    }

    fn default_url() -> Url {
        Url::parse("http://demo.twilio.com/docs/voice.xml").unwrap()
    }

    fn tool() -> (Arc<RecordingDialer>, VoiceTool) {
        let provider = Arc::new(RecordingDialer::default());
        (provider.clone(), VoiceTool::new(provider, default_url()))
    }

    fn args(to: &str, message: Option<&str>) -> MakeCallArgs {
        MakeCallArgs {
            to: to.to_string(),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn no_message_uses_default_url() {
        assert_eq!(
            call_instructions(None, &default_url()).unwrap(),
            CallInstructions::Url(default_url())
        );
        assert_eq!(
            call_instructions(Some("  "), &default_url()).unwrap(),
            CallInstructions::Url(default_url())
        );
    }

    #[test]
    fn url_message_is_fetched() {
        let instructions =
            call_instructions(Some("https://example.com/twiml.xml"), &default_url()).unwrap();
        assert_eq!(
            instructions,
            CallInstructions::Url(Url::parse("https://example.com/twiml.xml").unwrap())
        );
    }

    #[test]
    fn twiml_passes_through() {
        let twiml = "<Response><Play>https://example.com/a.mp3</Play></Response>";
        assert_eq!(
            call_instructions(Some(twiml), &default_url()).unwrap(),
            CallInstructions::Twiml(twiml.to_string())
        );
        assert!(call_instructions(Some("<Say>hi</Say>"), &default_url()).is_err());
    }

    #[test]
    fn plain_text_is_spoken_and_escaped() {
        let instructions =
            call_instructions(Some("Tom & Jerry say <hi>"), &default_url()).unwrap();
        assert_eq!(
            instructions,
            CallInstructions::Twiml(
                "<Response><Say>Tom &amp; Jerry say &lt;hi&gt;</Say></Response>".to_string()
            )
        );

        let sentence = call_instructions(Some("https://example.com is down"), &default_url());
        assert!(matches!(sentence, Ok(CallInstructions::Twiml(_))));
    }

    #[test]
    fn oversized_message_is_invalid() {
        let long = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(call_instructions(Some(&long), &default_url()).is_err());
    }

    #[tokio::test]
    async fn places_call() {
        let (provider, tool) = tool();
        let receipt = tool
            .call(args("+14155550123", Some("Your order has shipped")))
            .await
            .unwrap();
        assert_eq!(receipt.sid, "CA0001");

        let placed = provider.placed.lock().unwrap();
        assert_eq!(placed[0].to.as_str(), "+14155550123");
        assert!(matches!(placed[0].instructions, CallInstructions::Twiml(_)));
    }

    #[tokio::test]
    async fn invalid_number_never_reaches_provider() {
        let (provider, tool) = tool();
        for to in ["12345", " +14155550123\n", "+14155550123 "] {
            let err = tool.call(args(to, None)).await.unwrap_err();
            assert!(
                matches!(err.kind(), ToolErrorKind::InvalidPhoneNumber { .. }),
                "{to:?} gave {err}"
            );
        }
        assert!(provider.placed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_timeout_is_reported() {
        let provider = Arc::new(RecordingDialer {
            fail_with: Some(ProviderError::timeout("no response within 20s")),
            ..RecordingDialer::default()
        });
        let tool = VoiceTool::new(provider, default_url());
        let err = tool.call(args("+14155550123", None)).await.unwrap_err();
        assert!(err.is_provider());
        assert!(matches!(
            err.kind(),
            ToolErrorKind::Provider { code, .. } if code == "timeout"
        ));
    }
}
