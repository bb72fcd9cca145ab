//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::ClientConfig;
use super::secrets::SecretString;
use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

/// `${VAR}` placeholder with an upper-case variable name
pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Interpolate environment variables in a configuration string
///
/// Fails on the first referenced variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &Captures<'_>| {
        match env::var(&cap[1]) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| cap[1].to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::MissingEnvVar { var }),
        None => Ok(result.into_owned()),
    }
}

/// Interpolate the secret-bearing fields of a parsed config
///
/// Catches placeholders that reached the parsed values without passing
/// through [`interpolate_env_vars`], e.g. configs built in code.
pub fn interpolate_config_env_vars(config: &mut ClientConfig) -> Result<(), ConfigError> {
    for provider in &mut config.providers {
        let api_key = provider.api_key.expose_secret();
        if ENV_VAR_PATTERN.is_match(api_key) {
            provider.api_key = SecretString::new(interpolate_env_vars(api_key)?);
        }

        if let Some(base_url) = &provider.base_url {
            if ENV_VAR_PATTERN.is_match(base_url) {
                provider.base_url = Some(interpolate_env_vars(base_url)?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("CHATBRIDGE_TEST_VAR", "test_value");

        let content = "api_key: ${CHATBRIDGE_TEST_VAR}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "api_key: test_value");

        env::remove_var("CHATBRIDGE_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let content = "api_key: ${CHATBRIDGE_MISSING_VAR}";
        let result = interpolate_env_vars(content);

        match result {
            Err(ConfigError::MissingEnvVar { var }) => assert_eq!(var, "CHATBRIDGE_MISSING_VAR"),
            other => panic!("Expected MissingEnvVar error, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_env_vars() {
        env::set_var("CHATBRIDGE_VAR1", "value1");
        env::set_var("CHATBRIDGE_VAR2", "value2");

        let content = "key1: ${CHATBRIDGE_VAR1}, key2: ${CHATBRIDGE_VAR2}, again: ${CHATBRIDGE_VAR1}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "key1: value1, key2: value2, again: value1");

        env::remove_var("CHATBRIDGE_VAR1");
        env::remove_var("CHATBRIDGE_VAR2");
    }

    #[test]
    fn test_lowercase_placeholders_untouched() {
        let content = "prompt: ${not_a_var}";
        assert_eq!(interpolate_env_vars(content).unwrap(), content);
    }

    #[test]
    fn test_config_fields_interpolated() {
        env::set_var("CHATBRIDGE_TEST_KEY", "sk-from-env");

        let mut config: ClientConfig = serde_json::from_value(serde_json::json!({
            "version": "0.1",
            "providers": [{ "name": "openai", "type": "openai", "api_key": "${CHATBRIDGE_TEST_KEY}" }]
        }))
        .unwrap();

        interpolate_config_env_vars(&mut config).unwrap();
        assert_eq!(config.providers[0].api_key.expose_secret(), "sk-from-env");

        env::remove_var("CHATBRIDGE_TEST_KEY");
    }
}
