//! Error types for the bubble-map bot

use std::io;

use thiserror::Error;

/// Result type alias for the bubble-map bot
pub type Result<T> = std::result::Result<T, Error>;

/// Bubble-map bot errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chain code outside the supported set
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Upstream API answered with a non-success HTTP status
    #[error("{service} API error: HTTP {status}")]
    Upstream {
        /// Upstream service name
        service: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// Upstream API answered 200 but rejected the request in its body
    #[error("{service} API error: {message}")]
    UpstreamRejected {
        /// Upstream service name
        service: &'static str,
        /// Message reported by the service
        message: String,
    },

    /// Token analysis could not be completed; nothing was cached
    #[error("Token analysis failed for {key}: {source}")]
    ComputationFailed {
        /// Cache key (`chain:address`)
        key: String,
        /// Underlying hard failure
        #[source]
        source: Box<Error>,
    },

    /// A record for this key is already stored
    #[error("Token record already cached: {key}")]
    DuplicateKey {
        /// Cache key (`chain:address`)
        key: String,
    },

    /// Computed record cannot be stored faithfully
    #[error("Invalid token record: {0}")]
    InvalidRecord(String),

    /// Telegram Bot API reported a failure
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a hard failure from the analysis pipeline
    pub fn computation_failed(key: impl Into<String>, source: Error) -> Self {
        Self::ComputationFailed {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Whether the boundary retry should try again after this error
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Io(_) => true,
            _ => false,
        }
    }
}
