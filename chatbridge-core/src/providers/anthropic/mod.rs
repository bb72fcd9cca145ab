//! Anthropic provider implementation

mod client;
pub mod converter;
pub mod types;

pub use client::{AnthropicClient, ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS};
pub use types::{AnthropicRequest, AnthropicResponse};
