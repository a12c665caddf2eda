//! Core library for slakctl - a Slack command-line client.
//!
//! This crate provides:
//! - Configuration loading and management
//! - XDG-compliant path resolution
//! - Schema and example config generation
//! - Slack API client, paginated listing and search
//! - OAuth authorization-code exchange and credential storage
//! - Common types and error handling

pub mod config;
pub mod error;
pub mod paths;
pub mod schema;
pub mod slack;

pub use config::{
    AppConfig, LogLevel, LoggingConfig, PacingConfig, PathsConfig, RuntimeConfig, SlackConfig,
};
pub use error::{CoreError, Result};
pub use paths::{AppPaths, default_data_dir};
pub use schema::{generate_example_config, generate_schema, write_generated_files};
pub use slack::{
    AuthorizationError, ClientOptions, CredentialStore, Credentials, FetchOptions, OAuthClient,
    OAuthConfig, SlackClient,
};

/// Application name used for config directories and environment prefix.
pub const APP_NAME: &str = "slakctl";

/// Returns the environment variable prefix for this application.
#[must_use]
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
