//! Credential storage in a JSON file under the data directory.
//!
//! The file holds the bearer token and the Slack app's OAuth client
//! credentials. It is written with owner-only permissions on Unix.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Stored credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Bearer token used for every API call.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// OAuth client ID of the Slack app.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    /// OAuth client secret of the Slack app.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
}

impl Credentials {
    /// Whether a token is present.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Whether both OAuth client credentials are present.
    #[must_use]
    pub fn has_app_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by `path`. Nothing is read until [`Self::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load credentials. A missing file yields empty credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Credentials, CoreError> {
        if !self.path.exists() {
            return Ok(Credentials::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Credentials::default());
        }
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::Serialization(format!("parsing {}: {e}", self.path.display()))
        })
    }

    /// Load the token, failing when none has been stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Auth`] when no token is stored.
    pub fn load_token(&self) -> Result<String, CoreError> {
        let creds = self.load()?;
        if creds.has_token() {
            Ok(creds.token)
        } else {
            Err(CoreError::Auth(
                "no authentication token found. Run 'slakctl auth token' first".to_string(),
            ))
        }
    }

    /// Write credentials, replacing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, creds: &Credentials) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(creds)
            .map_err(|e| CoreError::Serialization(format!("serializing credentials: {e}")))?;
        let mut file = open_private(&self.path)?;
        file.write_all(json.as_bytes())?;
        restrict_permissions(&self.path)?;
        log::debug!("saved credentials to {}", self.path.display());
        Ok(())
    }

    /// Store a new token, keeping the app credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn save_token(&self, token: &str) -> Result<(), CoreError> {
        let mut creds = self.load()?;
        token.clone_into(&mut creds.token);
        self.save(&creds)
    }

    /// Store OAuth client credentials, keeping the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn save_app_credentials(&self, client_id: &str, client_secret: &str) -> Result<(), CoreError> {
        let mut creds = self.load()?;
        client_id.clone_into(&mut creds.client_id);
        client_secret.clone_into(&mut creds.client_secret);
        self.save(&creds)
    }

    /// Remove the token, keeping the app credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn clear_token(&self) -> Result<(), CoreError> {
        let mut creds = self.load()?;
        if !creds.has_token() {
            return Ok(());
        }
        creds.token.clear();
        self.save(&creds)
    }
}

/// Open for writing; a new file is created owner-only.
#[cfg(unix)]
fn open_private(path: &Path) -> Result<fs::File, CoreError> {
    use std::os::unix::fs::OpenOptionsExt;
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> Result<fs::File, CoreError> {
    Ok(fs::File::create(path)?)
}

// `mode` only applies on creation.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

/// Mask a secret for display: first and last four characters, or `****`
/// when shorter than eight characters.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}
