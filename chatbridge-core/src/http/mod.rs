//! HTTP transport for provider calls
//!
//! This module implements the network layer under each provider client:
//! - Connection pooling and client management
//! - Auth and correlation headers
//! - Error mapping and retry hints
//!
//! Provider clients only see the [`Transport`] trait, so tests can swap in
//! scripted transports without a network.

pub mod client;
pub mod error;

pub use client::{HttpTransport, TransportConfig};
pub use error::map_http_error;

use crate::providers::error::ProviderResult;
use async_trait::async_trait;
use serde_json::Value;

/// Submit a native request body, receive a native response body
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `path` relative to the provider's base URL
    async fn post(&self, path: &str, body: &Value, request_id: &str) -> ProviderResult<Value>;
}
