//! Client construction from configuration

use crate::cache::{CacheSettings, MemoryCache, ResponseCache};
use crate::config::{
    ClientConfig, ConfigError, ConfigResult, ConnectionConfig, ProviderConfig, SafeLogging,
};
use crate::http::TransportConfig;
use crate::providers::adapter::{ChatCompletion, ProviderCapabilities, ProviderType};
use crate::providers::anthropic::AnthropicClient;
use crate::providers::error::ProviderResult;
use crate::providers::ollama::OllamaClient;
use crate::providers::openai::OpenAIClient;
use crate::providers::pipeline::ClientSettings;
use std::sync::Arc;
use tracing::{debug, info};

/// Build one client per enabled provider
///
/// All clients share the given cache. When caching is enabled and no cache
/// is supplied, a fresh [`MemoryCache`] is created and shared.
pub fn build_clients(
    config: &ClientConfig,
    cache: Option<Arc<dyn ResponseCache>>,
) -> ConfigResult<Vec<Box<dyn ChatCompletion>>> {
    let cache = match cache {
        Some(cache) => Some(cache),
        None if config.cache.enabled => {
            Some(Arc::new(MemoryCache::new()) as Arc<dyn ResponseCache>)
        }
        None => None,
    };
    let cache_settings = CacheSettings::new(config.cache.enabled, cache);

    let mut clients = Vec::new();
    for provider in config.enabled_providers() {
        info!(provider = %provider.safe_for_logging(), "Building provider client");
        let client = create_client(
            provider,
            &config.connection,
            cache_settings.clone(),
            config.retry.max_retries,
        )
        .map_err(|source| ConfigError::ClientBuild {
            provider: provider.name.clone(),
            source,
        })?;
        clients.push(client);
    }

    debug!(count = clients.len(), "Provider clients ready");
    Ok(clients)
}

/// Build the client for a single provider entry
///
/// `retries` is the budget for calls that do not set their own.
pub fn create_client(
    provider: &ProviderConfig,
    connection: &ConnectionConfig,
    cache: CacheSettings,
    retries: u32,
) -> ProviderResult<Box<dyn ChatCompletion>> {
    let mut transport = TransportConfig::new(provider.base_url())
        .with_timeouts(connection.connect_timeout(), connection.request_timeout());
    transport.max_idle_per_host = connection.max_idle_per_host;

    let api_key = provider.api_key.expose_secret();

    let client: Box<dyn ChatCompletion> = match provider.provider_type {
        ProviderType::OpenAI => {
            let capabilities = OpenAIClient::default_capabilities(provider.supports_vision);
            let settings = settings_for(provider, capabilities, cache, retries);
            Box::new(OpenAIClient::connect(transport, Some(api_key), settings)?)
        }
        ProviderType::Anthropic => {
            let mut capabilities = AnthropicClient::default_capabilities();
            capabilities.supports_vision = provider.supports_vision;
            let settings = settings_for(provider, capabilities, cache, retries);

            let client = AnthropicClient::connect(transport, api_key, settings)?;
            match provider.max_tokens {
                Some(max_tokens) => Box::new(client.with_max_tokens(max_tokens)),
                None => Box::new(client),
            }
        }
        ProviderType::Ollama => {
            let mut capabilities = OllamaClient::default_capabilities();
            capabilities.supports_vision = provider.supports_vision;
            let settings = settings_for(provider, capabilities, cache, retries);
            Box::new(OllamaClient::connect(transport, settings)?)
        }
    };

    Ok(client)
}

fn settings_for(
    provider: &ProviderConfig,
    mut capabilities: ProviderCapabilities,
    cache: CacheSettings,
    retries: u32,
) -> ClientSettings {
    capabilities.supports_system_role = provider.supports_system_role;
    ClientSettings::new(provider.name.clone(), capabilities)
        .with_models(provider.models.clone())
        .with_cache(cache)
        .with_default_retries(retries)
}
