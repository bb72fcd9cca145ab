//! Chatbridge Core Library
//!
//! A provider-agnostic chat completion client. Callers build canonical
//! [`protocol::ChatCompletionOptions`], pick a client from [`providers`],
//! and receive either a canonical response or a validated structured
//! payload. Responses can be replayed from a pluggable [`cache`].

pub mod cache;
pub mod config;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod schema;
pub mod structured;

pub use protocol::{ChatCompletionOptions, ChatResponse, CompletionOutcome, Message};
pub use providers::{ChatCompletion, CompletionError, ProviderError};

/// Returns the version of the Chatbridge Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
