//! OpenAI client implementation

use super::converter::{from_openai_response, to_openai_request};
use super::types::OpenAIResponse;
use crate::http::{HttpTransport, Transport, TransportConfig};
use crate::protocol::ChatResponse;
use crate::providers::adapter::{ProviderBackend, ProviderCapabilities, ProviderType};
use crate::providers::error::ProviderResult;
use crate::providers::pipeline::{ClientSettings, PreparedRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Client for OpenAI and OpenAI-compatible chat completion servers
///
/// Structured output is requested natively with `response_format`
/// (`json_schema`); the reply is still parsed and validated locally.
pub struct OpenAIClient {
    settings: ClientSettings,
    transport: Arc<dyn Transport>,
}

impl OpenAIClient {
    /// Capabilities of an OpenAI target
    pub fn default_capabilities(supports_vision: bool) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_native_structured_output: true,
            supports_functions: true,
            supports_vision,
            supports_system_role: true,
        }
    }

    /// Create a client over an existing transport
    pub fn new(transport: Arc<dyn Transport>, settings: ClientSettings) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Create a client over HTTP; the key is sent as a bearer token when set
    pub fn connect(
        mut transport: TransportConfig,
        api_key: Option<&str>,
        settings: ClientSettings,
    ) -> ProviderResult<Self> {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            transport = transport.with_header("Authorization", format!("Bearer {}", key));
        }

        Ok(Self::new(Arc::new(HttpTransport::new(transport)?), settings))
    }

    /// Create a client for the public OpenAI endpoint
    pub fn connect_default(api_key: &str, settings: ClientSettings) -> ProviderResult<Self> {
        Self::connect(
            TransportConfig::new(ProviderType::OpenAI.default_base_url()),
            Some(api_key),
            settings,
        )
    }
}

#[async_trait]
impl ProviderBackend for OpenAIClient {
    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn dispatch(&self, request: PreparedRequest<'_>) -> ProviderResult<ChatResponse> {
        let body = to_openai_request(&request, self.settings.capabilities.supports_vision);
        let body = serde_json::to_value(&body)?;
        debug!(request_id = request.request_id, "OpenAI request body built");

        let raw = self
            .transport
            .post(CHAT_COMPLETIONS_PATH, &body, request.request_id)
            .await?;
        let response: OpenAIResponse = serde_json::from_value(raw)?;

        Ok(from_openai_response(response, &request.options.model))
    }
}
