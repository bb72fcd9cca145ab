//! Provider capability trait and capabilities
//!
//! [`ChatCompletion`] is the single operation every client exposes.
//! Concrete clients implement [`ProviderBackend`] (build a native request,
//! send it, normalize the reply) and receive [`ChatCompletion`] through a
//! blanket impl that runs the shared pipeline: cache, schema extraction
//! and retries.

use crate::protocol::{ChatCompletionOptions, ChatResponse, CompletionOutcome};
use crate::providers::error::{CompletionResult, ProviderResult};
use crate::providers::pipeline::{self, ClientSettings, PreparedRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical chat completion contract
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Get the provider's name
    fn name(&self) -> &str;

    /// Get the provider's capabilities
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Run one canonical completion call
    ///
    /// Returns [`CompletionOutcome::Structured`] when a response model was
    /// requested, [`CompletionOutcome::Response`] otherwise.
    async fn create_chat_completion(
        &self,
        options: &ChatCompletionOptions,
    ) -> CompletionResult<CompletionOutcome>;
}

/// Provider-specific half of a completion call
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    /// Identity, capabilities, models and cache of this client
    fn settings(&self) -> &ClientSettings;

    /// Convert to the native wire format, send, and normalize the reply
    async fn dispatch(&self, request: PreparedRequest<'_>) -> ProviderResult<ChatResponse>;
}

#[async_trait]
impl<T: ProviderBackend> ChatCompletion for T {
    fn name(&self) -> &str {
        &self.settings().name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.settings().capabilities
    }

    async fn create_chat_completion(
        &self,
        options: &ChatCompletionOptions,
    ) -> CompletionResult<CompletionOutcome> {
        pipeline::complete(self, options).await
    }
}

/// What a provider can do natively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Schema-constrained generation (`response_format: json_schema`)
    pub supports_native_structured_output: bool,

    /// Native tool definitions and tool calls
    pub supports_functions: bool,

    /// Image inputs
    pub supports_vision: bool,

    /// System messages (inline or lifted to a top-level field)
    pub supports_system_role: bool,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            supports_native_structured_output: false,
            supports_functions: false,
            supports_vision: false,
            supports_system_role: true,
        }
    }
}

/// Provider type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// OpenAI and OpenAI-compatible servers
    OpenAI,
    /// Anthropic Messages API
    Anthropic,
    /// Local Ollama server
    Ollama,
}

impl ProviderType {
    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
        }
    }

    /// Base URL used when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "https://api.openai.com/v1",
            ProviderType::Anthropic => "https://api.anthropic.com/v1",
            ProviderType::Ollama => "http://localhost:11434",
        }
    }

    /// Whether calls cannot be authenticated without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderType::Anthropic)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "ollama" => Ok(ProviderType::Ollama),
            other => Err(format!("unknown provider type '{}'", other)),
        }
    }
}
