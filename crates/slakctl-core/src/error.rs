//! Error types for the core library.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A configuration-related error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A path resolution or validation error.
    #[error("path error: {0}")]
    Path(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Missing or unusable credentials.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A caller-supplied argument was rejected before any request was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request never produced an HTTP response (DNS, connect, TLS, timeout).
    #[error("{endpoint}: transport error: {message}")]
    Transport {
        /// API method the request was addressed to.
        endpoint: String,
        /// Underlying client error.
        message: String,
    },

    /// The remote answered with a non-success status code.
    #[error("{endpoint}: HTTP {status}: {body}")]
    Http {
        /// API method the request was addressed to.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The request body could not be serialized.
    #[error("{endpoint}: encoding request body: {message}")]
    Encoding {
        /// API method the request was addressed to.
        endpoint: String,
        /// Serializer error.
        message: String,
    },

    /// The remote answered `ok: false`.
    #[error("{operation} failed: {code}")]
    Api {
        /// Human-readable operation name (e.g. `list channels`).
        operation: String,
        /// Error code reported by the API (e.g. `invalid_auth`).
        code: String,
    },
}

impl CoreError {
    /// Remote error code, if this is an `ok: false` API error.
    #[must_use]
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;
