//! Client error types.

use thiserror::Error;

/// Failure at the transport layer (command POST or page fetch).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("http status {status}")]
    Status { status: u16 },

    #[error("response decode failed (status {status}): {message}")]
    Decode { status: u16, message: String },
}

impl TransportError {
    /// The request reached the server and came back with HTTP 200.
    #[must_use]
    pub fn is_ok_status(&self) -> bool {
        matches!(self, Self::Decode { status: 200, .. })
    }
}

/// Invalid shell configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config json is invalid: {0}")]
    InvalidJson(String),
    #[error("api path must not be empty")]
    EmptyApiPath,
    #[error("login page title must not be empty")]
    EmptyLoginTitle,
    #[error("element id `{0}` must not be empty")]
    EmptyElementId(&'static str),
}

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cache key parts must not be empty (api: `{api}`, sub: `{sub}`)")]
    InvalidCacheKey { api: String, sub: String },

    #[error("state var `{key}` in store `{store}` already holds another type")]
    StateTypeMismatch { store: String, key: String },
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
