//! Ollama client implementation

use super::converter::{from_ollama_response, to_ollama_request};
use super::types::OllamaResponse;
use crate::http::{HttpTransport, Transport, TransportConfig};
use crate::protocol::ChatResponse;
use crate::providers::adapter::{ProviderBackend, ProviderCapabilities, ProviderType};
use crate::providers::error::ProviderResult;
use crate::providers::pipeline::{ClientSettings, PreparedRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const CHAT_PATH: &str = "/api/chat";

/// Client for a local Ollama server
///
/// Structured output is obtained by prompt injection. Tools are not
/// forwarded; when tools and a response model are combined, the validated
/// payload's `name` and `arguments` become a single tool call.
pub struct OllamaClient {
    settings: ClientSettings,
    transport: Arc<dyn Transport>,
}

impl OllamaClient {
    /// Capabilities of an Ollama target
    pub fn default_capabilities() -> ProviderCapabilities {
        ProviderCapabilities {
            supports_native_structured_output: false,
            supports_functions: false,
            supports_vision: true,
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

    /// Create a client over HTTP
    pub fn connect(transport: TransportConfig, settings: ClientSettings) -> ProviderResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(transport)?), settings))
    }

    /// Create a client for a server on the default local port
    pub fn connect_default(settings: ClientSettings) -> ProviderResult<Self> {
        Self::connect(
            TransportConfig::new(ProviderType::Ollama.default_base_url()),
            settings,
        )
    }
}

#[async_trait]
impl ProviderBackend for OllamaClient {
    fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    async fn dispatch(&self, request: PreparedRequest<'_>) -> ProviderResult<ChatResponse> {
        let body = serde_json::to_value(to_ollama_request(&request))?;
        debug!(request_id = request.request_id, "Ollama request body built");

        let raw = self.transport.post(CHAT_PATH, &body, request.request_id).await?;
        let response: OllamaResponse = serde_json::from_value(raw)?;

        Ok(from_ollama_response(response, &request.options.model))
    }
}
