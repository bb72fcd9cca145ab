//! Errors raised while loading a client config and turning it into clients

use crate::providers::error::ProviderError;
use thiserror::Error;

/// Failure to produce a usable [`ClientConfig`](super::ClientConfig) or its clients
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{}:{}: {message}", .line.unwrap_or(0), .column.unwrap_or(0))]
    Parse {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),

    #[error("placeholder ${{{var}}} references an unset environment variable")]
    MissingEnvVar { var: String },

    #[error("'{path}' is neither YAML nor JSON (extension {extension:?})")]
    UnsupportedFormat { path: String, extension: String },

    #[error("provider '{provider}' could not be connected: {source}")]
    ClientBuild {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// A rejected field, addressed by its dotted path (`providers[0].base_url`)
#[derive(Debug, Error)]
#[error("{field_path} {kind}")]
pub struct ValidationError {
    pub field_path: String,
    pub kind: ValidationErrorKind,
}

/// Why a field was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("is required")]
    Missing,

    #[error("needs an API key for {provider_type} endpoints")]
    MissingApiKey { provider_type: String },

    #[error("lists no providers")]
    NoProviders,

    #[error("has every provider disabled")]
    NoEnabledProvider,

    #[error("is {found}, only {supported} is understood")]
    UnsupportedVersion { found: String, supported: String },

    #[error("repeats '{value}'")]
    Duplicate { value: String },

    #[error("must be greater than zero")]
    NotPositive,

    #[error("allows {found} retries, at most {max} are permitted")]
    RetryBudgetTooLarge { found: u32, max: u32 },

    #[error("is not an http(s) URL: {reason}")]
    BadUrl { reason: String },

    #[error("still holds the placeholder ${{{var}}}")]
    UnresolvedPlaceholder { var: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
        }
    }

    /// The field is absent or blank
    pub fn missing(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::Missing)
    }

    /// The field is a zero count or duration
    pub fn not_positive(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::NotPositive)
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_reads_as_sentence() {
        let err = ValidationError::new(
            "providers[0].api_key",
            ValidationErrorKind::MissingApiKey {
                provider_type: "anthropic".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "providers[0].api_key needs an API key for anthropic endpoints"
        );
    }

    #[test]
    fn test_placeholder_messages_show_the_variable() {
        let err = ValidationError::new(
            "providers[1].base_url",
            ValidationErrorKind::UnresolvedPlaceholder {
                var: "OLLAMA_HOST".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "providers[1].base_url still holds the placeholder ${OLLAMA_HOST}"
        );

        let missing = ConfigError::MissingEnvVar {
            var: "OPENAI_API_KEY".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "placeholder ${OPENAI_API_KEY} references an unset environment variable"
        );
    }

    #[test]
    fn test_parse_error_points_at_location() {
        let err = ConfigError::Parse {
            path: "chatbridge.yaml".to_string(),
            line: Some(4),
            column: Some(7),
            message: "unknown field `priority`".to_string(),
        };
        assert_eq!(err.to_string(), "chatbridge.yaml:4:7: unknown field `priority`");
    }
}
