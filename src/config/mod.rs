//! Configuration management for toolgate.
//!
//! Configuration is assembled once at startup: a TOML file (if any) is
//! loaded, `.env` and the process environment are overlaid on top, and the
//! result is validated before any tool is constructed.
//!
//! # Configuration File Format
//!
//! Search order:
//! 1. `./toolgate.toml` (project-local)
//! 2. `~/.config/toolgate/config.toml` (XDG config)
//!
//! ```toml
//! [files]
//! base_dir = "app_io_files"
//! append_policy = "create_missing"   # or "require_existing"
//!
//! [telephony]
//! enabled = true
//! timeout_secs = 20
//! # account_sid / auth_token / from_phone usually come from
//! # TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_FROM_PHONE
//!
//! [model]
//! backend = "ai_studio"              # or "vertex_ai"
//! model = "gemini-2.5-flash"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use toolgate::config;
//!
//! // File + .env + environment, validated
//! let config = config::resolve(None)?;
//!
//! // Parse from a string
//! let config = config::from_str(toml_content)?;
//! ```

mod env;
mod file;
mod types;

pub use env::{apply_env, apply_process_env, load_dotenv, DotenvStatus};
pub use file::{find_config_file, from_path, from_str, load, search_paths, xdg_config_dir};
pub use types::{
    AppendPolicy, FileIoConfig, GatewayConfig, ModelBackend, ModelConfig, Secret,
    TelephonyConfig, TwilioCredentials, DEFAULT_BASE_DIR, DEFAULT_MODEL,
    DEFAULT_TWILIO_API_BASE, DEFAULT_VOICE_URL,
};

use crate::error::GatewayError;
use std::path::Path;

/// Builds the effective configuration without validating it.
///
/// Loads `path` if given (otherwise the default search paths), then `.env`,
/// then the process environment. The `.env` outcome is returned rather than
/// logged, since this usually runs before logging is set up.
///
/// # Errors
///
/// Returns a configuration error if the file is unreadable or invalid.
pub fn load_effective(path: Option<&Path>) -> Result<(GatewayConfig, DotenvStatus), GatewayError> {
    let mut config = match path {
        Some(path) => from_path(path)?,
        None => load()?,
    };
    let dotenv = load_dotenv();
    apply_process_env(&mut config);
    Ok((config, dotenv))
}

/// Builds the effective configuration and validates it.
///
/// # Errors
///
/// Returns a configuration error if the file is unreadable or invalid, or
/// if validation fails.
pub fn resolve(path: Option<&Path>) -> Result<GatewayConfig, GatewayError> {
    let (config, dotenv) = load_effective(path)?;
    dotenv.log();
    config.validate()?;
    Ok(config)
}
