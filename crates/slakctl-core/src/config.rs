//! Configuration types and loading for the application.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use config::{Config, Environment, File, FileFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::paths::write_default_config;
use crate::{AppPaths, env_prefix};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(
    title = "Application Configuration",
    description = "Main configuration for the application"
)]
pub struct AppConfig {
    /// JSON Schema reference for editor support.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub schema: Option<String>,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Runtime behavior configuration.
    pub runtime: RuntimeConfig,

    /// Custom location of the data directory.
    pub paths: PathsConfig,

    /// Slack endpoints and OAuth settings.
    pub slack: SlackConfig,

    /// Delays inserted between paginated requests.
    pub pacing: PacingConfig,
}

impl AppConfig {
    /// Load configuration from file and environment, creating defaults if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or written.
    pub fn load(paths: &AppPaths, dry_run: bool) -> Result<Self> {
        if !paths.config_file.exists() {
            if dry_run {
                log::info!(
                    "dry-run: would create default config at {}",
                    paths.config_file.display()
                );
            } else {
                write_default_config(&paths.config_file)?;
            }
        }

        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or a
    /// timeout is set to zero.
    pub fn load_from_path(config_file: &Path) -> Result<Self> {
        let env_prefix = env_prefix();
        let built = Config::builder()
            .set_default("logging.level", "warn")?
            .set_default("runtime.timeout", 60_i64)?
            .add_source(
                File::from(config_file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(env_prefix.as_str()).separator("__"))
            .build()?;

        let config: Self = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.runtime.timeout == Some(0) {
            bail!("runtime.timeout must be at least 1 second");
        }
        if self.slack.callback_timeout == 0 {
            bail!("slack.callback_timeout must be at least 1 second");
        }
        Ok(())
    }

    /// HTTP timeout applied to every API request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.timeout.unwrap_or(60))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: None,
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
            paths: PathsConfig::default(),
            slack: SlackConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Logging configuration")]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace) used when no verbosity
    /// flag is given on the command line.
    #[schemars(default = "default_log_level")]
    pub level: LogLevel,
}

/// Log level enumeration for schema validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only emit error-level messages.
    Error,
    /// Emit warnings and errors (default).
    #[default]
    Warn,
    /// Emit informational messages and above.
    Info,
    /// Emit debug diagnostics and above.
    Debug,
    /// Emit all messages including fine-grained traces.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

const fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Runtime behavior configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Runtime behavior configuration")]
pub struct RuntimeConfig {
    /// Timeout in seconds for each HTTP request (default: 60).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub timeout: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { timeout: Some(60) }
    }
}

/// Path override configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Custom location of the data directory")]
pub struct PathsConfig {
    /// Directory for persistent data (credentials). Supports ~ and environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

/// Slack endpoints and OAuth settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Slack Web API endpoints and OAuth settings")]
pub struct SlackConfig {
    /// Base URL of the Web API; methods are appended as path segments.
    pub api_base_url: String,

    /// Authorization page the user is sent to during `auth oauth`.
    pub authorize_url: String,

    /// Redirect URI registered with the Slack app. Must reach the local callback listener.
    pub redirect_uri: String,

    /// Local port the OAuth callback listener binds to.
    pub callback_port: u16,

    /// Seconds to wait for the OAuth callback before giving up.
    #[schemars(range(min = 1))]
    pub callback_timeout: u64,

    /// OAuth scopes requested during authorization.
    pub scopes: Vec<String>,
}

impl SlackConfig {
    /// Token exchange endpoint derived from the API base URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth.v2.access", self.api_base_url.trim_end_matches('/'))
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://slack.com/api".to_string(),
            authorize_url: "https://slack.com/oauth/v2/authorize".to_string(),
            redirect_uri: "http://localhost:8090/callback".to_string(),
            callback_port: 8090,
            callback_timeout: 300,
            scopes: [
                "channels:history",
                "channels:read",
                "channels:write",
                "chat:write",
                "search:read",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Delays inserted between paginated requests, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Delays between paginated requests to stay under Slack rate limits")]
pub struct PacingConfig {
    /// Pause between channel pages when fetching every channel (`--all`).
    pub channel_page_interval: u64,

    /// Pause between search result pages.
    pub search_page_interval: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            channel_page_interval: 3,
            search_page_interval: 1,
        }
    }
}
