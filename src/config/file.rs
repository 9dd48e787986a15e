//! Configuration file loading.
//!
//! Reads toolgate configuration from TOML files at project-local or
//! XDG-compliant locations.

use crate::config::types::GatewayConfig;
use crate::error::GatewayError;
use std::path::{Path, PathBuf};

/// Project-local config file name.
const LOCAL_CONFIG_NAME: &str = "toolgate.toml";

/// Config file name within the XDG config directory.
const XDG_CONFIG_NAME: &str = "config.toml";

/// Application name for XDG directory lookup.
const APP_NAME: &str = "toolgate";

/// Loads configuration from the default search paths.
///
/// Search order:
/// 1. `./toolgate.toml`
/// 2. `~/.config/toolgate/config.toml`
///
/// Returns the defaults if no file is found.
///
/// # Errors
///
/// Returns a configuration error if a file exists but cannot be parsed.
pub fn load() -> Result<GatewayConfig, GatewayError> {
    match find_config_file() {
        Some(path) => from_path(&path),
        None => Ok(GatewayConfig::default()),
    }
}

/// Returns the first existing file in [`search_paths`].
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    search_paths().into_iter().find(|p| p.is_file())
}

/// Loads configuration from a specific file.
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, is not valid
/// TOML, or does not match the expected schema.
pub fn from_path(path: &Path) -> Result<GatewayConfig, GatewayError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        GatewayError::configuration(
            "config_file",
            format!("failed to read '{}': {}", path.display(), e),
        )
    })?;

    from_str(&contents).map_err(|e| {
        GatewayError::configuration(
            "config_file",
            format!("failed to parse '{}': {}", path.display(), e),
        )
    })
}

/// Parses configuration from a TOML string.
///
/// # Errors
///
/// Returns a configuration error if the TOML is invalid or does not match
/// the schema.
pub fn from_str(toml_str: &str) -> Result<GatewayConfig, GatewayError> {
    toml::from_str(toml_str)
        .map_err(|e| GatewayError::configuration("config", format!("invalid TOML: {e}")))
}

/// Paths searched for a configuration file, in order.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_NAME)];

    if let Some(dir) = xdg_config_dir() {
        paths.push(dir.join(XDG_CONFIG_NAME));
    }

    paths
}

/// The toolgate directory under the user's config directory.
#[must_use]
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}
