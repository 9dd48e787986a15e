//! Twilio REST client.
//!
//! Messages and calls are created with form-encoded POSTs authenticated by
//! HTTP basic auth (account SID / auth token). The request and response
//! mapping lives in free functions so it can be checked without a network.

use super::{
    CallInstructions, CallReceipt, MessageReceipt, MessagingProvider, OutboundCall,
    OutboundMessage, ProviderError, ProviderFuture, VoiceProvider,
};
use crate::config::{TelephonyConfig, TwilioCredentials};
use crate::error::GatewayError;
use crate::logging::preview;
use crate::types::PhoneNumber;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const API_VERSION: &str = "2010-04-01";

/// Client for the Twilio Messages and Calls resources.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: Client,
    credentials: TwilioCredentials,
    api_base: String,
    timeout: Duration,
}

impl TwilioClient {
    /// Builds a client from validated telephony configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if credentials are missing or the HTTP
    /// client cannot be created.
    pub fn new(config: &TelephonyConfig) -> Result<Self, GatewayError> {
        let credentials = config.credentials()?;
        let timeout = config.timeout();
        let http = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::configuration("telephony", format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            credentials,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// The configured sender number.
    #[must_use]
    pub fn from_phone(&self) -> &PhoneNumber {
        &self.credentials.from_phone
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: String,
        form: Vec<(&'static str, String)>,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.credentials.account_sid,
                Some(self.credentials.auth_token.expose()),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::new(
                "invalid_response",
                format!("unexpected response from provider: {e}"),
            )
        })
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::timeout(format!(
                "no response from provider within {}s",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            ProviderError::transport(format!("connection failed: {error}"))
        } else {
            ProviderError::transport(error.to_string())
        }
    }
}

impl MessagingProvider for TwilioClient {
    fn send_message<'a>(&'a self, message: &'a OutboundMessage) -> ProviderFuture<'a, MessageReceipt> {
        Box::pin(async move {
            tracing::info!(
                to = %message.to.masked(),
                body = %preview(&message.body, 30),
                media = message.media_url.is_some(),
                "sending message"
            );
            let url = messages_url(&self.api_base, &self.credentials.account_sid);
            let form = message_form(&self.credentials.from_phone, message);
            let response: MessageResource = self.post(url, form).await?;
            Ok(response.into_receipt())
        })
    }
}

impl VoiceProvider for TwilioClient {
    fn place_call<'a>(&'a self, call: &'a OutboundCall) -> ProviderFuture<'a, CallReceipt> {
        Box::pin(async move {
            tracing::info!(to = %call.to.masked(), "placing call");
            let url = calls_url(&self.api_base, &self.credentials.account_sid);
            let form = call_form(&self.credentials.from_phone, call);
            let response: CallResource = self.post(url, form).await?;
            Ok(response.into_receipt())
        })
    }
}

/// Endpoint for creating messages.
#[must_use]
pub fn messages_url(api_base: &str, account_sid: &str) -> String {
    format!(
        "{}/{API_VERSION}/Accounts/{account_sid}/Messages.json",
        api_base.trim_end_matches('/')
    )
}

/// Endpoint for creating calls.
#[must_use]
pub fn calls_url(api_base: &str, account_sid: &str) -> String {
    format!(
        "{}/{API_VERSION}/Accounts/{account_sid}/Calls.json",
        api_base.trim_end_matches('/')
    )
}

/// Form parameters for a message. `Body` is omitted for media-only messages.
#[must_use]
pub fn message_form(from: &PhoneNumber, message: &OutboundMessage) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("To", message.to.as_str().to_string()),
        ("From", from.as_str().to_string()),
    ];
    if !message.body.is_empty() {
        form.push(("Body", message.body.clone()));
    }
    if let Some(media) = &message.media_url {
        form.push(("MediaUrl", media.to_string()));
    }
    form
}

/// Form parameters for a call.
#[must_use]
pub fn call_form(from: &PhoneNumber, call: &OutboundCall) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("To", call.to.as_str().to_string()),
        ("From", from.as_str().to_string()),
    ];
    match &call.instructions {
        CallInstructions::Url(url) => form.push(("Url", url.to_string())),
        CallInstructions::Twiml(twiml) => form.push(("Twiml", twiml.clone())),
    }
    form
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

/// Maps a non-success response to a [`ProviderError`].
///
/// Twilio error bodies carry a numeric `code` and a `message`; anything else
/// falls back to `http_<status>` with the raw body.
#[must_use]
pub fn error_from_response(status: u16, body: &str) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(code) = parsed.code {
            let message = parsed
                .message
                .unwrap_or_else(|| format!("request failed with status {status}"));
            return ProviderError::new(code.to_string(), message);
        }
        if let Some(message) = parsed.message {
            return ProviderError::new(format!("http_{status}"), message);
        }
    }

    let message = if body.trim().is_empty() {
        format!("request failed with status {status}")
    } else {
        preview(body.trim(), 200)
    };
    ProviderError::new(format!("http_{status}"), message)
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: String,
    to: String,
    from: String,
    #[serde(default)]
    num_media: Option<String>,
}

impl MessageResource {
    fn into_receipt(self) -> MessageReceipt {
        MessageReceipt {
            num_media: self
                .num_media
                .as_deref()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),
            sid: self.sid,
            status: self.status,
            to: self.to,
            from: self.from,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    status: String,
    to: String,
    from: String,
}

impl CallResource {
    fn into_receipt(self) -> CallReceipt {
        CallReceipt {
            sid: self.sid,
            status: self.status,
            to: self.to,
            from: self.from,
        }
    }
}
