//! OpenAI provider implementation
//!
//! This module provides a client for the OpenAI Chat Completions API,
//! translating between the canonical protocol and OpenAI's format.

mod client;
pub mod converter;
pub mod types;

pub use client::OpenAIClient;
pub use types::{OpenAIRequest, OpenAIResponse};
