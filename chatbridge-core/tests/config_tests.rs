//! Integration tests for configuration loading and client construction

use chatbridge_core::config::{
    load, load_from_json, load_from_yaml, ConfigError, SafeLogging, ValidationErrorKind,
};
use chatbridge_core::providers::{build_clients, ChatCompletion, ProviderType};
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    env::set_var("CHATBRIDGE_IT_OPENAI_KEY", "sk-integration-0000");

    let yaml = r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: ${CHATBRIDGE_IT_OPENAI_KEY}
    models: [gpt-4o-mini, gpt-4o]
  - name: local
    type: ollama
    base_url: http://localhost:11434
    models: ["gemma2:2b"]
    supports_vision: false
connection:
  request_timeout_ms: 30000
cache:
  enabled: true
retry:
  max_retries: 2
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "chatbridge.yaml", yaml);
    let config = load_from_yaml(&path).unwrap();

    assert_eq!(config.providers.len(), 2);
    assert_eq!(config.providers[0].provider_type, ProviderType::OpenAI);
    assert_eq!(
        config.providers[0].api_key.expose_secret(),
        "sk-integration-0000"
    );
    assert_eq!(config.providers[0].base_url(), "https://api.openai.com/v1");
    assert!(!config.providers[1].supports_vision);
    assert_eq!(config.connection.request_timeout_ms, 30000);
    assert_eq!(config.connection.connect_timeout_ms, 10000);
    assert!(config.cache.enabled);
    assert_eq!(config.retry.max_retries, 2);

    let logged = config.safe_for_logging();
    assert!(!logged.contains("sk-integration-0000"));
}

#[test]
fn test_load_valid_json_config() {
    let json = r#"{
        "version": "0.1",
        "providers": [
            { "name": "claude", "type": "anthropic", "api_key": "sk-ant-abcdefgh", "max_tokens": 1024 }
        ]
    }"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "chatbridge.json", json);
    let config = load_from_json(&path).unwrap();

    assert_eq!(config.providers[0].provider_type, ProviderType::Anthropic);
    assert_eq!(config.providers[0].max_tokens, Some(1024));
    assert!(!config.cache.enabled);
    assert_eq!(config.retry.max_retries, 3);
}

#[test]
fn test_load_picks_format_from_extension() {
    let dir = TempDir::new().unwrap();
    let yaml = "version: \"0.1\"\nproviders:\n  - name: local\n    type: ollama\n";
    let path = create_test_file(&dir, "chatbridge.yml", yaml);
    assert!(load(&path).is_ok());

    let path = create_test_file(&dir, "chatbridge.toml", yaml);
    assert!(matches!(load(&path), Err(ConfigError::UnsupportedFormat { .. })));
}

#[test]
fn test_missing_env_var_fails() {
    let yaml = r#"
version: "0.1"
providers:
  - name: openai
    type: openai
    api_key: ${CHATBRIDGE_IT_DEFINITELY_UNSET}
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "chatbridge.yaml", yaml);

    match load_from_yaml(&path) {
        Err(ConfigError::MissingEnvVar { var }) => {
            assert_eq!(var, "CHATBRIDGE_IT_DEFINITELY_UNSET")
        }
        other => panic!("expected MissingEnvVar, got {:?}", other),
    }
}

#[test]
fn test_unknown_field_is_a_parse_error() {
    let yaml = r#"
version: "0.1"
providers:
  - name: local
    type: ollama
routing:
  strategy: round_robin
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "chatbridge.yaml", yaml);

    assert!(matches!(
        load_from_yaml(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_invalid_base_url_fails_validation() {
    let yaml = r#"
version: "0.1"
providers:
  - name: local
    type: ollama
    base_url: ftp://localhost:11434
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "chatbridge.yaml", yaml);

    match load_from_yaml(&path) {
        Err(ConfigError::Validation(err)) => {
            assert_eq!(err.field_path, "providers[0].base_url");
            assert!(matches!(err.kind, ValidationErrorKind::BadUrl { .. }));
        }
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.yaml");

    assert!(matches!(
        load_from_yaml(&path),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn test_build_clients_from_loaded_config() {
    let yaml = r#"
version: "0.1"
providers:
  - name: gpt
    type: openai
    api_key: sk-test-key-123456
  - name: claude
    type: anthropic
    api_key: sk-ant-test-123456
    enabled: false
  - name: local
    type: ollama
    models: ["gemma2:2b"]
cache:
  enabled: true
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "chatbridge.yaml", yaml);
    let config = load_from_yaml(&path).unwrap();

    let clients = build_clients(&config, None).unwrap();
    let names: Vec<&str> = clients.iter().map(|c| c.name()).collect();

    assert_eq!(names, vec!["gpt", "local"]);
    assert!(clients[0].capabilities().supports_native_structured_output);
    assert!(!clients[1].capabilities().supports_functions);
}
