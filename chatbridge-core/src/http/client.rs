//! HTTP transport implementation using reqwest

use crate::http::error::map_http_error;
use crate::http::Transport;
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("chatbridge/", env!("CARGO_PKG_VERSION"));

/// Settings for one provider endpoint
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,

    /// Headers sent with every request (auth, API version)
    pub headers: Vec<(String, String)>,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Whole-request timeout
    pub request_timeout: Duration,

    /// Idle connections kept per host
    pub max_idle_per_host: usize,

    /// Responses larger than this are rejected
    pub max_response_size: usize,
}

impl TransportConfig {
    /// Create a config for a base URL with default timeouts
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: Vec::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_idle_per_host: 10,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set connect and request timeouts
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Cap the accepted response size
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }
}

/// Shared HTTP transport with connection pooling
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// The underlying reqwest client (internally reference counted)
    client: Client,

    /// Base URL without a trailing slash
    base_url: String,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpTransport {
    /// Build a transport from its config
    pub fn new(config: TransportConfig) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ProviderError::InvalidRequest {
                    message: format!("Invalid header name '{}': {}", name, e),
                }
            })?;
            let mut value = HeaderValue::from_str(value).map_err(|e| {
                ProviderError::InvalidRequest {
                    message: format!("Invalid value for header '{}': {}", name, e),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::NetworkError {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_response_size: config.max_response_size,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Validate response content type
    fn validate_content_type(response: &Response) -> ProviderResult<()> {
        if let Some(content_type) = response.headers().get("content-type") {
            let content_type = content_type.to_str().unwrap_or("").to_lowercase();

            if !content_type.contains("application/json") {
                return Err(ProviderError::Custom {
                    code: "INVALID_CONTENT_TYPE".to_string(),
                    message: format!("Expected application/json, got: {}", content_type),
                });
            }
        }

        Ok(())
    }

    fn check_size(&self, size: usize, request_id: &str) -> ProviderResult<()> {
        if size > self.max_response_size {
            return Err(ProviderError::Custom {
                code: "RESPONSE_TOO_LARGE".to_string(),
                message: format!(
                    "Response size {} exceeds maximum {} [request_id: {}]",
                    size, self.max_response_size, request_id
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: &Value, request_id: &str) -> ProviderResult<Value> {
        let url = self.build_url(path);
        debug!(request_id, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Request-ID", request_id)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!(request_id, "Request timeout for {}", url);
                } else {
                    error!(request_id, "Request error for {}: {}", url, e);
                }
                ProviderError::from(e)
            })?;

        let status = response.status();
        debug!(request_id, "Response status: {}", status);

        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.ok();

            warn!(request_id, "Request to {} failed with status {}", url, status);

            return Err(map_http_error(status, Some(&headers), body.as_deref(), request_id));
        }

        Self::validate_content_type(&response)?;

        if let Some(length) = response.content_length() {
            self.check_size(length as usize, request_id)?;
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                message: format!("Failed to read response body: {} [request_id: {}]", e, request_id),
            })?;

        self.check_size(text.len(), request_id)?;

        serde_json::from_str(&text).map_err(|e| {
            error!(request_id, "Failed to parse response from {}: {}", url, e);
            ProviderError::ParseError {
                message: format!("Invalid response format: {} [request_id: {}]", e, request_id),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let transport =
            HttpTransport::new(TransportConfig::new("http://localhost:11434/")).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:11434");
        assert_eq!(transport.build_url("/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(transport.build_url("api/chat"), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = TransportConfig::new("http://localhost").with_header("bad header", "x");
        assert!(matches!(
            HttpTransport::new(config),
            Err(ProviderError::InvalidRequest { .. })
        ));
    }
}
