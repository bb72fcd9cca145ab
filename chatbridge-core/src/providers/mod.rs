//! Provider clients and the shared completion pipeline
//!
//! Every client exposes [`ChatCompletion`]. Provider variants implement
//! [`ProviderBackend`] and share caching, schema extraction and retries
//! through [`pipeline`].

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod retry;
pub mod shaping;

pub use adapter::{ChatCompletion, ProviderBackend, ProviderCapabilities, ProviderType};
pub use error::{CompletionError, CompletionResult, ProviderError, ProviderResult};
pub use factory::{build_clients, create_client};
pub use pipeline::{ClientSettings, NativeSchema, PreparedRequest};
pub use retry::{RetryExecutor, RetryPolicy, RetryResult};

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
