//! Ollama provider implementation

mod client;
pub mod converter;
pub mod types;

pub use client::OllamaClient;
pub use types::{OllamaRequest, OllamaResponse};
