//! Secrets handling and redaction for configuration
//!
//! API keys are wrapped in [`SecretString`], which never prints its value
//! through `Display` or `Debug`. [`SafeLogging`] renders whole configs for
//! logs with secrets masked.

use super::schema::{ClientConfig, ProviderConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A wrapper type for sensitive strings like API keys
#[derive(Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get a partially redacted version for debugging
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let len = self.value.len();
        if len <= 8 || !self.value.is_ascii() {
            "[REDACTED]".to_string()
        } else if self.value.starts_with("sk-") {
            format!("{}...{}", &self.value[..3], &self.value[len - 4..])
        } else {
            format!("{}...{}", &self.value[..2], &self.value[len - 2..])
        }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A trait for types that can be logged safely
pub trait SafeLogging {
    /// Returns a safe version for logging
    fn safe_for_logging(&self) -> String;
}

impl SafeLogging for ProviderConfig {
    fn safe_for_logging(&self) -> String {
        format!(
            "{} ({}, base_url={}, api_key={}, models={}, enabled={})",
            self.name,
            self.provider_type,
            self.base_url(),
            self.api_key.partial_redact(),
            self.models.len(),
            self.enabled
        )
    }
}

impl SafeLogging for ClientConfig {
    fn safe_for_logging(&self) -> String {
        let providers = self
            .providers
            .iter()
            .map(SafeLogging::safe_for_logging)
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "version={} cache={} max_retries={} providers=[{}]",
            self.version, self.cache.enabled, self.retry.max_retries, providers
        )
    }
}

/// Redact a value when its field name looks sensitive
pub fn redact_by_field_name(field_name: &str, value: &str) -> String {
    const SENSITIVE: [&str; 7] = [
        "api_key",
        "secret",
        "token",
        "password",
        "credential",
        "auth",
        "private",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE.iter().any(|pattern| field_lower.contains(pattern)) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}
