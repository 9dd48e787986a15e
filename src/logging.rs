//! Logging setup for the toolgate binary.
//!
//! Two sinks, both optional: a daily rolling file under the user's data
//! directory, and stderr. stdout is never used, since `serve` speaks its
//! protocol there. `RUST_LOG` overrides the configured level.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Logging settings, the `[logging]` section of the config file.
///
/// ```rust
/// use toolgate::logging::{LoggingConfig, LogLevel};
///
/// let config = LoggingConfig::new()
///     .with_log_dir("/var/log/toolgate")
///     .with_level(LogLevel::Debug);
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write to a rolling log file
    pub enabled: bool,
    /// Log file stem; files are named `{app_name}.log.YYYY-MM-DD`
    pub app_name: String,
    /// Defaults to `<data dir>/toolgate/logs`
    pub log_dir: Option<PathBuf>,
    pub level: LogLevel,
    /// Also write to stderr
    pub stderr: bool,
}

impl LoggingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No file, no stderr.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            stderr: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: "toolgate".to_string(),
            log_dir: None,
            level: LogLevel::default(),
            stderr: false,
        }
    }
}

/// Minimum level recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level '{other}'; expected trace, debug, info, warn or error"
            )),
        }
    }
}

/// Keeps the background file writer alive; dropping it flushes pending lines.
pub struct LoggingGuard {
    _file: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard")
            .field("file", &self._file.is_some())
            .finish()
    }
}

/// Errors raised while setting up logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    pub kind: LoggingErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// No data directory could be determined for the default log location
    NoDataDir,
    CreateDirFailed { path: PathBuf, reason: String },
    /// A global subscriber was already installed
    SubscriberInitFailed { reason: String },
}

impl LoggingError {
    #[must_use]
    pub fn new(kind: LoggingErrorKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub fn no_data_dir() -> Self {
        Self::new(LoggingErrorKind::NoDataDir)
    }

    #[must_use]
    pub fn create_dir_failed(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::CreateDirFailed {
            path,
            reason: reason.into(),
        })
    }

    #[must_use]
    pub fn subscriber_init_failed(reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::SubscriberInitFailed {
            reason: reason.into(),
        })
    }

    #[must_use]
    pub fn is_no_data_dir(&self) -> bool {
        matches!(self.kind, LoggingErrorKind::NoDataDir)
    }
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoDataDir => write!(
                f,
                "could not determine a data directory for logs; set logging.log_dir"
            ),
            LoggingErrorKind::CreateDirFailed { path, reason } => write!(
                f,
                "failed to create log directory '{}': {}; check permissions or set logging.log_dir",
                path.display(),
                reason
            ),
            LoggingErrorKind::SubscriberInitFailed { reason } => write!(
                f,
                "failed to initialize tracing subscriber: {reason}; a subscriber may already be set"
            ),
        }
    }
}

impl std::error::Error for LoggingError {}

/// Directory the log file is written to.
///
/// # Errors
///
/// Returns `NoDataDir` if no custom directory is set and the platform data
/// directory is unknown.
pub fn log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    if let Some(dir) = &config.log_dir {
        return Ok(dir.clone());
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("toolgate").join("logs"))
        .ok_or_else(LoggingError::no_data_dir)
}

/// Installs the global subscriber.
///
/// Returns `Ok(None)` when both sinks are disabled. The returned guard must
/// be held for as long as logs should be written.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<LoggingGuard>, LoggingError> {
    if !config.enabled && !config.stderr {
        return Ok(None);
    }

    let filter = EnvFilter::builder()
        .with_default_directive(config.level.to_filter().into())
        .from_env_lossy();

    let (file_layer, file_guard) = if config.enabled {
        let dir = log_dir(config)?;
        std::fs::create_dir_all(&dir)
            .map_err(|e| LoggingError::create_dir_failed(dir.clone(), e.to_string()))?;

        let appender = tracing_appender::rolling::daily(&dir, format!("{}.log", config.app_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = config.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::subscriber_init_failed(e.to_string()))?;

    Ok(Some(LoggingGuard { _file: file_guard }))
}

/// Shortens free text for log lines, keeping the first `max` characters.
#[must_use]
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert!(!config.stderr);
        assert_eq!(config.app_name, "toolgate");
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config, LoggingConfig::new());
    }

    #[test]
    fn builder() {
        let config = LoggingConfig::new()
            .with_app_name("gateway")
            .with_log_dir("/tmp/logs")
            .with_level(LogLevel::Warn)
            .with_stderr(true);
        assert_eq!(config.app_name, "gateway");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.level, LogLevel::Warn);
        assert!(config.stderr);
    }

    #[test]
    fn level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().unwrap_err().contains("loud"));
        assert_eq!(LogLevel::Error.to_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn level_deserializes_lowercase() {
        let config: LoggingConfig = toml::from_str("level = \"trace\"").unwrap();
        assert_eq!(config.level, LogLevel::Trace);
        assert!(config.enabled);
    }

    #[test]
    fn custom_log_dir_wins() {
        let config = LoggingConfig::new().with_log_dir("/custom/logs");
        assert_eq!(log_dir(&config).unwrap(), PathBuf::from("/custom/logs"));
    }

    #[test]
    fn default_log_dir_is_under_toolgate() {
        if let Ok(dir) = log_dir(&LoggingConfig::default()) {
            assert!(dir.ends_with("toolgate/logs"));
        }
    }

    #[test]
    fn disabled_installs_nothing() {
        assert!(init_logging(&LoggingConfig::disabled()).unwrap().is_none());
    }

    #[test]
    fn error_messages_carry_hints() {
        let error = LoggingError::create_dir_failed(PathBuf::from("/ro/logs"), "read-only");
        let message = error.to_string();
        assert!(message.contains("/ro/logs"));
        assert!(message.contains("logging.log_dir"));
        assert!(LoggingError::no_data_dir().is_no_data_dir());
    }

    #[test]
    fn preview_truncates_long_text() {
        assert_eq!(preview("short", 30), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
    }
}
