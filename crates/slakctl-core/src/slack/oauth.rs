//! OAuth v2 authorization-code exchange.
//!
//! [`OAuthClient::begin`] generates the anti-forgery token, builds the
//! authorize URL and starts the callback listener; the returned
//! [`PendingAuthorization`] is then completed with a timeout. The listener is
//! shut down on every exit path of [`PendingAuthorization::complete`].

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::{Client, Url};
use thiserror::Error;

use crate::config::AppConfig;
use crate::slack::callback::{CallbackResult, CallbackServer};
use crate::slack::models::TokenGrant;

/// Bytes of entropy in the anti-forgery token.
pub const STATE_BYTES: usize = 32;

/// Failures of the authorization-code exchange.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// The redirect carried an `error` parameter.
    #[error("authorization denied: {reason}")]
    AuthorizationDenied {
        /// Value of the `error` parameter.
        reason: String,
    },

    /// The echoed `state` did not match the one we issued.
    #[error("state mismatch: possible CSRF attack, authorization aborted")]
    StateMismatch,

    /// No redirect arrived in time.
    #[error("timed out after {0:?} waiting for the authorization callback")]
    CallbackTimeout(Duration),

    /// The code could not be exchanged for a token.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The callback listener could not start or died.
    #[error("callback listener error: {0}")]
    Listener(String),

    /// The configured authorize URL is not a valid URL.
    #[error("invalid authorize URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client for the token exchange could not be built.
    #[error("creating HTTP client: {0}")]
    HttpClient(String),
}

/// Where an authorization attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// Nothing issued yet.
    Idle,
    /// Authorize URL built.
    UrlIssued,
    /// Listener running, waiting for the redirect.
    AwaitingCallback,
    /// Token obtained.
    Succeeded,
    /// Denied, state mismatch, or exchange failure.
    Failed,
    /// No redirect within the timeout.
    TimedOut,
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::UrlIssued => "url-issued",
            Self::AwaitingCallback => "awaiting-callback",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// One authorization attempt: its anti-forgery token and phase.
pub struct AuthSession {
    state: String,
    phase: FlowPhase,
}

impl AuthSession {
    /// Start a session with a fresh random state token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: generate_state(),
            phase: FlowPhase::Idle,
        }
    }

    /// The anti-forgery token.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> FlowPhase {
        self.phase
    }

    fn advance(&mut self, next: FlowPhase) {
        log::debug!("oauth: {} -> {next}", self.phase);
        self.phase = next;
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &"<redacted>")
            .field("phase", &self.phase)
            .finish()
    }
}

/// Generate a URL-safe anti-forgery token from 256 random bits.
#[must_use]
pub fn generate_state() -> String {
    let bytes: [u8; STATE_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Settings for the authorization-code exchange.
#[derive(Clone)]
pub struct OAuthConfig {
    /// Slack app client ID.
    pub client_id: String,
    /// Slack app client secret.
    pub client_secret: String,
    /// Authorize endpoint the user is sent to.
    pub authorize_url: String,
    /// Token endpoint (`oauth.v2.access`).
    pub token_url: String,
    /// Redirect target registered with the Slack app.
    pub redirect_uri: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Local port the callback listener binds.
    pub callback_port: u16,
    /// Timeout for the token exchange request.
    pub request_timeout: Duration,
}

impl OAuthConfig {
    /// Build from the application config and stored app credentials.
    #[must_use]
    pub fn from_app_config(
        config: &AppConfig,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: config.slack.authorize_url.clone(),
            token_url: config.slack.token_url(),
            redirect_uri: config.slack.redirect_uri.clone(),
            scopes: config.slack.scopes.clone(),
            callback_port: config.slack.callback_port,
            request_timeout: config.request_timeout(),
        }
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("callback_port", &self.callback_port)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Runs the authorization-code exchange against one Slack app.
#[derive(Debug)]
pub struct OAuthClient {
    config: OAuthConfig,
    http_client: Client,
}

impl OAuthClient {
    /// Create a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::HttpClient`] if the HTTP client cannot
    /// be built.
    pub fn new(config: OAuthConfig) -> Result<Self, AuthorizationError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("slakctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthorizationError::HttpClient(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Authorize URL for `session`: client ID, comma-joined scopes,
    /// redirect URI and the session's state token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::InvalidUrl`] if the configured
    /// authorize URL does not parse.
    pub fn authorization_url(&self, session: &AuthSession) -> Result<Url, AuthorizationError> {
        let scopes = self.config.scopes.join(",");
        Url::parse_with_params(
            &self.config.authorize_url,
            [
                ("client_id", self.config.client_id.as_str()),
                ("scope", scopes.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", session.state()),
            ],
        )
        .map_err(|e| AuthorizationError::InvalidUrl(format!("{}: {e}", self.config.authorize_url)))
    }

    /// Issue the authorize URL and start the callback listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the listener cannot bind.
    pub async fn begin(&self) -> Result<PendingAuthorization<'_>, AuthorizationError> {
        let mut session = AuthSession::new();
        let url = self.authorization_url(&session)?;
        session.advance(FlowPhase::UrlIssued);

        let server = CallbackServer::bind(self.config.callback_port).await?;
        session.advance(FlowPhase::AwaitingCallback);

        Ok(PendingAuthorization {
            client: self,
            session,
            url,
            server,
        })
    }

    /// Exchange an authorization code for an access token (`oauth.v2.access`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::TokenExchange`] on transport failure,
    /// a non-success status, `ok: false`, or a response without a token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AuthorizationError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthorizationError::TokenExchange(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AuthorizationError::TokenExchange(format!("reading response: {e}")))?;

        if !status.is_success() {
            return Err(AuthorizationError::TokenExchange(format!(
                "HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&bytes)
            )));
        }

        let grant: TokenGrant = crate::slack::client::decode_envelope("token exchange", &bytes)
            .map_err(|e| {
                AuthorizationError::TokenExchange(e.api_code().map_or_else(|| e.to_string(), str::to_string))
            })?;

        grant.into_token().ok_or_else(|| {
            AuthorizationError::TokenExchange("response did not contain an access token".to_string())
        })
    }
}

/// An issued authorize URL with its listener running.
#[derive(Debug)]
pub struct PendingAuthorization<'a> {
    client: &'a OAuthClient,
    session: AuthSession,
    url: Url,
    server: CallbackServer,
}

impl PendingAuthorization<'_> {
    /// URL the user must open.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The anti-forgery token embedded in the URL.
    #[must_use]
    pub fn state(&self) -> &str {
        self.session.state()
    }

    /// Address of the callback listener.
    #[must_use]
    pub const fn callback_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Wait for the redirect, validate it and exchange the code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::CallbackTimeout`],
    /// [`AuthorizationError::AuthorizationDenied`],
    /// [`AuthorizationError::StateMismatch`] or
    /// [`AuthorizationError::TokenExchange`] depending on where the flow
    /// stopped.
    pub async fn complete(self, timeout: Duration) -> Result<String, AuthorizationError> {
        let Self {
            client,
            mut session,
            server: mut listener,
            ..
        } = self;

        let delivered = listener.wait(timeout).await;
        listener.shutdown().await;

        let outcome = match delivered {
            Ok(result) => resolve(client, &session, result).await,
            Err(e) => Err(e),
        };

        session.advance(match &outcome {
            Ok(_) => FlowPhase::Succeeded,
            Err(AuthorizationError::CallbackTimeout(_)) => FlowPhase::TimedOut,
            Err(_) => FlowPhase::Failed,
        });

        outcome
    }
}

async fn resolve(
    client: &OAuthClient,
    session: &AuthSession,
    result: CallbackResult,
) -> Result<String, AuthorizationError> {
    match result {
        CallbackResult::Denied { reason } => Err(AuthorizationError::AuthorizationDenied { reason }),
        CallbackResult::Code { code, state } => {
            if state != session.state() {
                return Err(AuthorizationError::StateMismatch);
            }
            client.exchange_code(&code).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig::from_app_config(&AppConfig::default(), "123.456", "shh-app-secret")
    }

    #[test]
    fn state_is_256_bits_url_safe() {
        let state = generate_state();
        assert_eq!(URL_SAFE_NO_PAD.decode(&state).expect("decode").len(), STATE_BYTES);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(state, generate_state());
    }

    #[test]
    fn authorization_url_carries_all_parameters() {
        let client = OAuthClient::new(config()).expect("client");
        let session = AuthSession::new();
        let url = client.authorization_url(&session).expect("url");

        assert_eq!(url.host_str(), Some("slack.com"));
        assert_eq!(url.path(), "/oauth/v2/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "123.456");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8090/callback");
        assert_eq!(pairs["state"], session.state());
        assert!(pairs["scope"].contains("search:read"));
        assert!(pairs["scope"].contains(','));
    }

    #[test]
    fn invalid_authorize_url_is_reported() {
        let mut cfg = config();
        cfg.authorize_url = "not a url".to_string();
        let err = OAuthClient::new(cfg)
            .expect("client")
            .authorization_url(&AuthSession::new())
            .expect_err("invalid");
        assert!(matches!(err, AuthorizationError::InvalidUrl(_)));
    }

    #[test]
    fn token_exchange_uses_runtime_timeout() {
        let mut app = AppConfig::default();
        app.runtime.timeout = Some(7);
        let cfg = OAuthConfig::from_app_config(&app, "id", "secret");
        assert_eq!(cfg.request_timeout, Duration::from_secs(7));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?} {:?}", config(), AuthSession::new());
        assert!(!rendered.contains("shh-app-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn session_starts_idle() {
        let mut session = AuthSession::default();
        assert_eq!(session.phase(), FlowPhase::Idle);
        session.advance(FlowPhase::UrlIssued);
        assert_eq!(session.phase().to_string(), "url-issued");
    }
}
