//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::providers::ProviderType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Supported configuration schema version
pub const CONFIG_VERSION: &str = "0.1";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Provider endpoints, one client each
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Global connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Response cache switch
    #[serde(default)]
    pub cache: CacheConfig,

    /// Structured output retry budget
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,

    /// Provider type (openai, anthropic, ollama)
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// API key (supports environment variable interpolation)
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    /// Base URL; the provider type's public endpoint when absent
    #[serde(default)]
    pub base_url: Option<String>,

    /// Models this provider serves; empty accepts any model
    #[serde(default)]
    pub models: Vec<String>,

    /// Whether image parts are sent as-is (false flattens them to text)
    #[serde(default = "default_true")]
    pub supports_vision: bool,

    /// Whether the endpoint accepts system messages (false folds them into
    /// the first user turn)
    #[serde(default = "default_true")]
    pub supports_system_role: bool,

    /// Default generation limit
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Whether this provider is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }
}

impl ConnectionConfig {
    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether clients consult the response cache
    #[serde(default)]
    pub enabled: bool,
}

/// Retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Default retry budget for schema extraction failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn empty_secret() -> SecretString {
    SecretString::new("")
}
fn default_max_retries() -> u32 {
    crate::protocol::DEFAULT_RETRIES
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_request_timeout() -> u64 {
    60_000
}
fn default_max_idle() -> usize {
    10
}

impl ClientConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::missing("version"));
        }

        if self.version != CONFIG_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::UnsupportedVersion {
                    found: self.version.clone(),
                    supported: CONFIG_VERSION.to_string(),
                },
            ));
        }

        if self.providers.is_empty() {
            return Err(ValidationError::new(
                "providers",
                ValidationErrorKind::NoProviders,
            ));
        }

        let mut seen_names = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            if !seen_names.insert(&provider.name) {
                return Err(ValidationError::new(
                    format!("providers[{}].name", i),
                    ValidationErrorKind::Duplicate {
                        value: provider.name.clone(),
                    },
                ));
            }

            provider.validate(&format!("providers[{}]", i))?;
        }

        if self.connection.request_timeout_ms == 0 {
            return Err(ValidationError::not_positive(
                "connection.request_timeout_ms",
            ));
        }

        Ok(())
    }

    /// Providers that should get a client
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

impl ProviderConfig {
    /// Validate provider configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::missing(format!("{}.name", path)));
        }

        if self.provider_type.requires_api_key() && self.api_key.is_empty() {
            return Err(ValidationError::new(
                format!("{}.api_key", path),
                ValidationErrorKind::MissingApiKey {
                    provider_type: self.provider_type.to_string(),
                },
            ));
        }

        if let Some(base_url) = &self.base_url {
            let field = format!("{}.base_url", path);
            match url::Url::parse(base_url) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => {
                    return Err(ValidationError::new(
                        field,
                        ValidationErrorKind::BadUrl {
                            reason: format!("scheme is {}", url.scheme()),
                        },
                    ));
                }
                Err(e) => {
                    return Err(ValidationError::new(
                        field,
                        ValidationErrorKind::BadUrl {
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }

        let mut seen_models = HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            let model_path = format!("{}.models[{}]", path, i);

            if model.trim().is_empty() {
                return Err(ValidationError::missing(model_path));
            }

            if !seen_models.insert(model) {
                return Err(ValidationError::new(
                    model_path,
                    ValidationErrorKind::Duplicate {
                        value: model.clone(),
                    },
                ));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(ValidationError::not_positive(format!(
                "{}.max_tokens",
                path
            )));
        }

        Ok(())
    }

    /// Configured base URL or the provider type's default
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider_type.default_base_url())
    }
}
