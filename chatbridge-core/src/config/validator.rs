//! Configuration validation utilities

use super::env::ENV_VAR_PATTERN;
use super::error::{ValidationError, ValidationErrorKind};
use super::schema::ClientConfig;

/// Upper bound for the structured output retry budget
pub const MAX_RETRY_BUDGET: u32 = 10;

/// Configuration validator with rules beyond the structural checks
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Reject configs whose placeholders were never interpolated
    allow_placeholders: bool,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `${VAR}` placeholders left in values (useful for linting templates)
    pub fn allow_placeholders(mut self) -> Self {
        self.allow_placeholders = true;
        self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &ClientConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_enabled(config)?;
        self.validate_retry_budget(config)?;
        if !self.allow_placeholders {
            self.validate_placeholders(config)?;
        }

        Ok(())
    }

    fn validate_enabled(&self, config: &ClientConfig) -> Result<(), ValidationError> {
        if config.enabled_providers().next().is_none() {
            return Err(ValidationError::new(
                "providers",
                ValidationErrorKind::NoEnabledProvider,
            ));
        }
        Ok(())
    }

    fn validate_retry_budget(&self, config: &ClientConfig) -> Result<(), ValidationError> {
        if config.retry.max_retries > MAX_RETRY_BUDGET {
            return Err(ValidationError::new(
                "retry.max_retries",
                ValidationErrorKind::RetryBudgetTooLarge {
                    found: config.retry.max_retries,
                    max: MAX_RETRY_BUDGET,
                },
            ));
        }
        Ok(())
    }

    fn validate_placeholders(&self, config: &ClientConfig) -> Result<(), ValidationError> {
        for (i, provider) in config.providers.iter().enumerate() {
            if let Some(var) = self.extract_env_vars(provider.api_key.expose_secret()).first() {
                return Err(unresolved(format!("providers[{}].api_key", i), var));
            }

            if let Some(base_url) = &provider.base_url {
                if let Some(var) = self.extract_env_vars(base_url).first() {
                    return Err(unresolved(format!("providers[{}].base_url", i), var));
                }
            }
        }
        Ok(())
    }

    /// Extract environment variable names referenced in a string
    pub fn extract_env_vars(&self, text: &str) -> Vec<String> {
        ENV_VAR_PATTERN
            .captures_iter(text)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}

fn unresolved(field_path: String, var: &str) -> ValidationError {
    ValidationError::new(
        field_path,
        ValidationErrorKind::UnresolvedPlaceholder {
            var: var.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ProviderConfig, RetryConfig};
    use crate::config::SecretString;

    fn config_with_key(api_key: &str) -> ClientConfig {
        serde_json::from_value(serde_json::json!({
            "version": "0.1",
            "providers": [{ "name": "openai", "type": "openai", "api_key": api_key }]
        }))
        .unwrap()
    }

    #[test]
    fn test_env_var_extraction() {
        let validator = ConfigValidator::new();

        let text = "api_key: ${OPENAI_API_KEY}, url: ${API_BASE_URL}";
        let vars = validator.extract_env_vars(text);

        assert_eq!(vars, vec!["OPENAI_API_KEY", "API_BASE_URL"]);
    }

    #[test]
    fn test_unresolved_placeholder_rejected() {
        let config = config_with_key("${OPENAI_API_KEY}");

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field_path, "providers[0].api_key");
        assert_eq!(
            err.kind,
            ValidationErrorKind::UnresolvedPlaceholder {
                var: "OPENAI_API_KEY".to_string()
            }
        );

        assert!(ConfigValidator::new()
            .allow_placeholders()
            .validate(&config)
            .is_ok());
    }

    #[test]
    fn test_all_disabled_rejected() {
        let mut config = config_with_key("sk-test");
        config.providers[0].enabled = false;

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field_path, "providers");
        assert_eq!(err.kind, ValidationErrorKind::NoEnabledProvider);
    }

    #[test]
    fn test_retry_budget_bounded() {
        let mut config = config_with_key("sk-test");
        config.retry = RetryConfig { max_retries: 50 };

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field_path, "retry.max_retries");
        assert_eq!(
            err.kind,
            ValidationErrorKind::RetryBudgetTooLarge { found: 50, max: 10 }
        );
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = config_with_key("sk-test");
        config.providers.push(ProviderConfig {
            name: "claude".to_string(),
            provider_type: crate::providers::ProviderType::Anthropic,
            api_key: SecretString::new("sk-ant-test"),
            base_url: Some("https://api.anthropic.com/v1".to_string()),
            models: vec!["claude-3-5-haiku-20241022".to_string()],
            supports_vision: true,
            supports_system_role: true,
            max_tokens: Some(1024),
            enabled: true,
        });

        assert!(ConfigValidator::new().validate(&config).is_ok());
    }
}
