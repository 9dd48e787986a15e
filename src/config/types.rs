//! Configuration types for toolgate.
//!
//! All sections deserialize from TOML with every field optional; the
//! defaults below apply to whatever is left out.

use crate::error::GatewayError;
use crate::logging::LoggingConfig;
use crate::types::PhoneNumber;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default base directory for the file tools.
pub const DEFAULT_BASE_DIR: &str = "app_io_files";

/// Default Twilio REST endpoint.
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// TwiML played when a call is placed without a message.
pub const DEFAULT_VOICE_URL: &str = "http://demo.twilio.com/docs/voice.xml";

/// Default provider timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Provider timeouts are clamped to this range.
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 10..=30;

/// Default model name handed to the planning runtime.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default system instruction for the planning agent.
pub const DEFAULT_INSTRUCTION: &str = "You are a helpful AI assistant. You have a variety of tools available. \
When a user asks for something, first consider if any of your tools can help. \
If so, call the appropriate tool(s). If not, respond directly to the user. \
When using tools, the results will be provided to you; use them to formulate your final response. \
Available tools can solve math, perform file operations (read, write, append, delete in a specific directory), \
send SMS/MMS, and make calls.";

/// A credential that never appears in logs or printed configuration.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value. Only for handing to the provider.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("<redacted>")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self)
    }
}

/// What `append_file` does when the target does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendPolicy {
    /// Create the file and any missing parent directories
    #[default]
    CreateMissing,
    /// Fail with `NotFound`
    RequireExisting,
}

/// File tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIoConfig {
    /// Directory all file operations are confined to
    pub base_dir: PathBuf,
    pub append_policy: AppendPolicy,
    /// Create `base_dir` at startup if it does not exist
    pub create_base_dir: bool,
}

impl Default for FileIoConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            append_policy: AppendPolicy::default(),
            create_base_dir: true,
        }
    }
}

/// Messaging and voice provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    /// Register `send_message` and `make_call`
    pub enabled: bool,
    pub account_sid: Option<String>,
    pub auth_token: Option<Secret>,
    /// Sender number, E.164
    pub from_phone: Option<String>,
    pub api_base_url: String,
    pub timeout_secs: u64,
    /// TwiML document URL used when `make_call` has no message
    pub default_voice_url: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            account_sid: None,
            auth_token: None,
            from_phone: None,
            api_base_url: DEFAULT_TWILIO_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_voice_url: DEFAULT_VOICE_URL.to_string(),
        }
    }
}

/// Validated provider credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: Secret,
    pub from_phone: PhoneNumber,
}

impl TelephonyConfig {
    /// Provider timeout, clamped to 10..=30 seconds.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        let secs = self
            .timeout_secs
            .clamp(*TIMEOUT_RANGE_SECS.start(), *TIMEOUT_RANGE_SECS.end());
        Duration::from_secs(secs)
    }

    /// Extracts and checks the credentials.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing or malformed
    /// credential.
    pub fn credentials(&self) -> Result<TwilioCredentials, GatewayError> {
        let account_sid = match self.account_sid.as_deref().map(str::trim) {
            Some(sid) if is_account_sid(sid) => sid.to_string(),
            Some(sid) if !sid.is_empty() => {
                return Err(GatewayError::configuration(
                    "telephony.account_sid",
                    "expected 'AC' followed by 32 hex digits",
                ))
            }
            _ => {
                return Err(GatewayError::configuration(
                    "telephony.account_sid",
                    "missing account SID; set TWILIO_ACCOUNT_SID",
                ))
            }
        };

        let auth_token = match &self.auth_token {
            Some(token) if !token.is_empty() => token.clone(),
            _ => {
                return Err(GatewayError::configuration(
                    "telephony.auth_token",
                    "missing auth token; set TWILIO_AUTH_TOKEN",
                ))
            }
        };

        let from_phone = match self.from_phone.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => PhoneNumber::parse(number).map_err(|e| {
                GatewayError::configuration("telephony.from_phone", e.to_string())
            })?,
            _ => {
                return Err(GatewayError::configuration(
                    "telephony.from_phone",
                    "missing sender number; set TWILIO_FROM_PHONE",
                ))
            }
        };

        Ok(TwilioCredentials {
            account_sid,
            auth_token,
            from_phone,
        })
    }

    fn validate(&self) -> Result<(), GatewayError> {
        let base = url::Url::parse(&self.api_base_url).map_err(|e| {
            GatewayError::configuration("telephony.api_base_url", format!("invalid URL: {e}"))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(GatewayError::configuration(
                "telephony.api_base_url",
                "must be an http or https URL",
            ));
        }
        url::Url::parse(&self.default_voice_url).map_err(|e| {
            GatewayError::configuration("telephony.default_voice_url", format!("invalid URL: {e}"))
        })?;
        self.credentials().map(|_| ())
    }
}

/// Account SIDs are embedded in request paths, so only the documented shape
/// is accepted.
fn is_account_sid(sid: &str) -> bool {
    sid.len() == 34
        && sid.starts_with("AC")
        && sid[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Which model API the planning runtime should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBackend {
    /// API-key based access
    #[default]
    AiStudio,
    /// Project/location based access
    VertexAi,
}

/// Planning runtime settings. Passed through, never used locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub model: String,
    pub api_key: Option<Secret>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub agent_name: String,
    pub instruction: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            project: None,
            location: None,
            agent_name: "planner".to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

impl ModelConfig {
    /// Problems that will likely stop the planning runtime from starting.
    ///
    /// These are reported, not enforced: the model is external and may be
    /// configured by other means.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self.backend {
            ModelBackend::AiStudio => {
                if self.api_key.as_ref().map_or(true, Secret::is_empty) {
                    warnings.push(
                        "model backend is ai_studio but no API key is set; set GOOGLE_API_KEY"
                            .to_string(),
                    );
                }
            }
            ModelBackend::VertexAi => {
                if self.project.as_deref().map_or(true, str::is_empty) {
                    warnings.push(
                        "model backend is vertex_ai but no project is set; set GOOGLE_CLOUD_PROJECT"
                            .to_string(),
                    );
                }
                if self.location.as_deref().map_or(true, str::is_empty) {
                    warnings.push(
                        "model backend is vertex_ai but no location is set; set GOOGLE_CLOUD_LOCATION"
                            .to_string(),
                    );
                }
            }
        }
        if self.model.trim().is_empty() {
            warnings.push("model name is empty".to_string());
        }
        warnings
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub files: FileIoConfig,
    pub telephony: TelephonyConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Checks everything the gateway needs before any tool is built.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty base directory, or, when
    /// telephony is enabled, a missing or malformed credential.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.files.base_dir.as_os_str().is_empty() {
            return Err(GatewayError::configuration(
                "files.base_dir",
                "base directory must not be empty",
            ));
        }
        if self.telephony.enabled {
            self.telephony.validate()?;
        }
        Ok(())
    }
}
