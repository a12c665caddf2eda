//! Slack Web API client and authorization.
//!
//! This module provides:
//! - The request executor and `{ok, error}` envelope decoding
//! - Cursor-paginated channel listing and page-numbered message search
//! - The OAuth authorization-code exchange and its callback listener
//! - File-backed credential storage

pub mod callback;
pub mod channels;
pub mod client;
pub mod fetch;
pub mod models;
pub mod oauth;
pub mod search;
pub mod storage;

pub use callback::{CallbackResult, CallbackServer};
pub use client::{ClientOptions, SlackClient, decode_envelope, normalize_channel};
pub use fetch::{DEFAULT_CHANNEL_CAP, DEFAULT_SEARCH_CAP, FetchOptions, Pacing, ProgressFn};
pub use models::{AuthIdentity, Channel, ChannelRef, Message, PostedMessage, SearchResults};
pub use oauth::{
    AuthSession, AuthorizationError, FlowPhase, OAuthClient, OAuthConfig, PendingAuthorization,
};
pub use storage::{CredentialStore, Credentials, mask_secret};
