//! Environment variable overlay.
//!
//! Values from the environment replace whatever the config file set. The
//! lookup is injected so callers (and tests) decide where values come from.

use crate::config::types::{GatewayConfig, ModelBackend, Secret};
use std::path::PathBuf;

pub const TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
/// Older name for the account SID, read when `TWILIO_ACCOUNT_SID` is unset
pub const TWILIO_SID: &str = "TWILIO_SID";
pub const TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const TWILIO_FROM_PHONE: &str = "TWILIO_FROM_PHONE";
pub const TOOLGATE_FILE_BASE_DIR: &str = "TOOLGATE_FILE_BASE_DIR";
pub const TOOLGATE_TELEPHONY_ENABLED: &str = "TOOLGATE_TELEPHONY_ENABLED";
pub const TOOLGATE_MODEL: &str = "TOOLGATE_MODEL";
pub const GOOGLE_GENAI_USE_VERTEXAI: &str = "GOOGLE_GENAI_USE_VERTEXAI";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const GOOGLE_CLOUD_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";

/// What happened when looking for a `.env` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    Missing,
    /// The file exists but could not be parsed; it was skipped
    Malformed(String),
}

impl DotenvStatus {
    /// Records the outcome. Call once logging is initialized.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Self::Missing => tracing::debug!("no .env file"),
            Self::Malformed(error) => tracing::warn!(%error, "ignoring malformed .env file"),
        }
    }
}

/// Loads `.env` from the current directory into the process environment.
///
/// Variables already set in the environment win over the file. A missing
/// or malformed file is not an error.
pub fn load_dotenv() -> DotenvStatus {
    match dotenvy::dotenv() {
        Ok(path) => DotenvStatus::Loaded(path),
        Err(e) if e.not_found() => DotenvStatus::Missing,
        Err(e) => DotenvStatus::Malformed(e.to_string()),
    }
}

/// Applies the process environment to `config`.
pub fn apply_process_env(config: &mut GatewayConfig) {
    apply_env(config, |key| std::env::var(key).ok());
}

/// Applies environment overrides read through `lookup`.
///
/// Empty values count as unset.
pub fn apply_env<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(sid) = get(TWILIO_ACCOUNT_SID).or_else(|| get(TWILIO_SID)) {
        config.telephony.account_sid = Some(sid);
    }
    if let Some(token) = get(TWILIO_AUTH_TOKEN) {
        config.telephony.auth_token = Some(Secret::new(token));
    }
    if let Some(from) = get(TWILIO_FROM_PHONE) {
        config.telephony.from_phone = Some(from);
    }
    if let Some(enabled) = get(TOOLGATE_TELEPHONY_ENABLED) {
        match parse_flag(&enabled) {
            Some(flag) => config.telephony.enabled = flag,
            None => tracing::warn!(
                variable = TOOLGATE_TELEPHONY_ENABLED,
                value = %enabled,
                "expected true or false; keeping configured value"
            ),
        }
    }

    if let Some(dir) = get(TOOLGATE_FILE_BASE_DIR) {
        config.files.base_dir = PathBuf::from(dir);
    }

    if let Some(flag) = get(GOOGLE_GENAI_USE_VERTEXAI) {
        match parse_flag(&flag) {
            Some(true) => config.model.backend = ModelBackend::VertexAi,
            Some(false) => config.model.backend = ModelBackend::AiStudio,
            None => tracing::warn!(
                variable = GOOGLE_GENAI_USE_VERTEXAI,
                value = %flag,
                "expected TRUE or FALSE; keeping configured backend"
            ),
        }
    }
    if let Some(key) = get(GOOGLE_API_KEY) {
        config.model.api_key = Some(Secret::new(key));
    }
    if let Some(project) = get(GOOGLE_CLOUD_PROJECT) {
        config.model.project = Some(project);
    }
    if let Some(location) = get(GOOGLE_CLOUD_LOCATION) {
        config.model.location = Some(location);
    }
    if let Some(model) = get(TOOLGATE_MODEL) {
        config.model.model = model;
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
