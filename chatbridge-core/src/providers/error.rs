//! Provider and completion error types

use std::time::Duration;
use thiserror::Error;

/// Result type for provider transport operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type for canonical completion calls
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Errors raised by an upstream provider or the transport to it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Rate limit exceeded, retry after specified duration
    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<Duration> },

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Temporary server error (5xx)
    #[error("Server error ({status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    /// Invalid request that should not be retried (4xx)
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Authentication failure
    #[error("Authentication failed")]
    AuthenticationError,

    /// Model not available or unsupported
    #[error("Model '{model}' not available")]
    ModelNotAvailable { model: String },

    /// Generic network error
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Response body could not be decoded
    #[error("Failed to parse response: {message}")]
    ParseError { message: String },

    /// Provider-specific error
    #[error("Error [{code}]: {message}")]
    Custom { code: String, message: String },
}

impl ProviderError {
    /// Whether a caller could reasonably retry this request later
    ///
    /// The completion core never retries transport errors itself; this is
    /// a hint for outer layers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit { .. } => true,
            Self::Timeout => true,
            Self::ServerError { .. } => true,
            Self::NetworkError { .. } => true,
            Self::ModelNotAvailable { .. } => false,
            Self::InvalidRequest { .. } => false,
            Self::AuthenticationError => false,
            Self::ParseError { .. } => false,
            Self::Custom { .. } => false,
        }
    }

    /// Get suggested retry delay for this error
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after } => *retry_after,
            Self::Timeout => Some(Duration::from_secs(1)),
            Self::ServerError { .. } => Some(Duration::from_secs(2)),
            Self::NetworkError { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::NetworkError {
                message: format!("Connection failed: {}", err),
            }
        } else if err.is_decode() {
            ProviderError::ParseError {
                message: err.to_string(),
            }
        } else {
            ProviderError::NetworkError {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::ParseError {
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by a canonical completion call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompletionError {
    /// The options were rejected before any work was done
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The client does not serve the requested model
    #[error("Model '{model}' is not supported by provider '{provider}'")]
    UnsupportedModel { provider: String, model: String },

    /// The response schema could not be described
    #[error("Failed to serialize response schema '{name}': {message}")]
    SchemaSerialization { name: String, message: String },

    /// The reply was not valid JSON
    #[error("Failed to parse structured response: {message}")]
    SchemaParse { message: String, raw: String },

    /// The reply did not conform to the schema
    #[error("Structured response failed schema validation: {message}")]
    SchemaValidation { message: String, raw: String },

    /// Schema validation still failed when the retry budget ran out
    #[error("Invalid response schema after {attempts} attempt(s): {message}")]
    InvalidResponseSchema {
        message: String,
        raw: String,
        attempts: u32,
    },

    /// The provider call itself failed
    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

impl CompletionError {
    /// Whether the retry controller may run another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SchemaSerialization { .. }
                | Self::SchemaParse { .. }
                | Self::SchemaValidation { .. }
        )
    }

    /// Form in which an error leaves an exhausted retry loop
    ///
    /// Validation failures become [`CompletionError::InvalidResponseSchema`];
    /// every other error is returned unchanged.
    pub fn into_terminal(self, attempts: u32) -> Self {
        match self {
            Self::SchemaValidation { message, raw } => Self::InvalidResponseSchema {
                message,
                raw,
                attempts,
            },
            other => other,
        }
    }
}
