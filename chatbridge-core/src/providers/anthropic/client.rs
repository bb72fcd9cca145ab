//! Anthropic client implementation

use super::converter::{from_anthropic_response, to_anthropic_request};
use super::types::AnthropicResponse;
use crate::http::{HttpTransport, Transport, TransportConfig};
use crate::protocol::ChatResponse;
use crate::providers::adapter::{ProviderBackend, ProviderCapabilities, ProviderType};
use crate::providers::error::{ProviderError, ProviderResult};
use crate::providers::pipeline::{ClientSettings, PreparedRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const MESSAGES_PATH: &str = "/messages";

/// Anthropic API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default generation limit when the caller sets none
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Client for the Anthropic Messages API
///
/// Structured output is obtained by prompt injection; tools are forwarded
/// natively and `tool_use` blocks come back as tool calls.
pub struct AnthropicClient {
    settings: ClientSettings,
    transport: Arc<dyn Transport>,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Capabilities of an Anthropic target
    pub fn default_capabilities() -> ProviderCapabilities {
        ProviderCapabilities {
            supports_native_structured_output: false,
            supports_functions: true,
            supports_vision: true,
            supports_system_role: true,
        }
    }

    /// Create a client over an existing transport
    pub fn new(transport: Arc<dyn Transport>, settings: ClientSettings) -> Self {
        Self {
            settings,
            transport,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a client over HTTP with the Anthropic auth and version headers
    pub fn connect(
        transport: TransportConfig,
        api_key: &str,
        settings: ClientSettings,
    ) -> ProviderResult<Self> {
        if api_key.is_empty() {
            return Err(ProviderError::AuthenticationError);
        }

        let transport = transport
            .with_header("x-api-key", api_key)
            .with_header("anthropic-version", ANTHROPIC_VERSION);

        Ok(Self::new(Arc::new(HttpTransport::new(transport)?), settings))
    }

    /// Create a client for the public Anthropic endpoint
    pub fn connect_default(api_key: &str, settings: ClientSettings) -> ProviderResult<Self> {
        Self::connect(
            TransportConfig::new(ProviderType::Anthropic.default_base_url()),
            api_key,
            settings,
        )
    }

    /// Set the generation limit used when the caller sets none
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl ProviderBackend for AnthropicClient {
    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn dispatch(&self, request: PreparedRequest<'_>) -> ProviderResult<ChatResponse> {
        let body = serde_json::to_value(to_anthropic_request(&request, self.max_tokens))?;
        debug!(request_id = request.request_id, "Anthropic request body built");

        let raw = self
            .transport
            .post(MESSAGES_PATH, &body, request.request_id)
            .await?;
        let response: AnthropicResponse = serde_json::from_value(raw)?;

        Ok(from_anthropic_response(response, &request.options.model))
    }
}
