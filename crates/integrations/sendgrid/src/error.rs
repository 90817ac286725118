use mailgate_core::AddressError;
use thiserror::Error;

/// Errors raised while applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A credential was supplied with a non-string type.
    #[error("invalid {name} specified: {value} must be a string")]
    InvalidCredential {
        /// Option name (`api_user` or `api_key`).
        name: &'static str,
        /// The rejected value.
        value: serde_json::Value,
    },

    /// The endpoint is not an absolute URL.
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),

    /// Only JSON responses can be parsed.
    #[error("unsupported format {0:?}, expected \"json\"")]
    UnsupportedFormat(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The API answered with HTTP 429 (Too Many Requests).
    #[error("rate limited by SendGrid")]
    RateLimited,

    /// `api_user` or `api_key` is missing or empty.
    #[error("SendGrid credentials are not configured")]
    MissingCredentials,
}

impl TransportError {
    /// Returns `true` if the failure is transient and a later attempt may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::RateLimited => true,
            Self::MissingCredentials => false,
        }
    }
}

/// Errors surfaced by [`SendgridMailer::deliver`](crate::SendgridMailer::deliver).
#[derive(Debug, Error)]
pub enum SendgridError {
    /// The message lacks a sender, recipients or body. Raised before any
    /// request is made.
    #[error("invalid message: {0}")]
    Validation(String),

    /// An address could not be normalized.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// The client configuration is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The API accepted the request but reported a failure. Carries the
    /// API's message verbatim.
    #[error("SendGrid delivery failed: {0}")]
    Delivery(String),

    /// The request did not complete.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The headers could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SendgridError {
    /// Returns `true` if retrying the same delivery may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_retryable())
    }
}
