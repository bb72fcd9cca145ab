//! Response cache port
//!
//! Completed calls can be stored under a [`CacheKey`] and replayed without
//! contacting the provider. Storage is pluggable through [`ResponseCache`];
//! [`MemoryCache`] is the in-process implementation.

mod key;
mod memory;

pub use key::CacheKey;
pub use memory::MemoryCache;

use crate::protocol::{ChatResponse, CompletionOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Cache errors
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Storage backend failure
    #[error("cache backend: {0}")]
    Backend(String),

    /// Entry could not be encoded or decoded
    #[error("serialization: {0}")]
    Serialization(String),
}

/// A stored result, opaque to the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheEntry {
    /// Canonical response
    Response(ChatResponse),
    /// Validated structured payload
    Structured(Value),
}

impl From<CompletionOutcome> for CacheEntry {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Response(response) => CacheEntry::Response(response),
            CompletionOutcome::Structured(value) => CacheEntry::Structured(value),
        }
    }
}

impl From<CacheEntry> for CompletionOutcome {
    fn from(entry: CacheEntry) -> Self {
        match entry {
            CacheEntry::Response(response) => CompletionOutcome::Response(response),
            CacheEntry::Structured(value) => CompletionOutcome::Structured(value),
        }
    }
}

/// Key/value contract for completed calls
///
/// The request id is passed for log correlation only and must never
/// influence which entry is returned. Implementations must tolerate
/// concurrent use; last writer wins.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up an entry; `Ok(None)` is a miss
    async fn get(&self, key: &CacheKey, request_id: &str)
        -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry
    async fn set(&self, key: &CacheKey, value: CacheEntry, request_id: &str)
        -> Result<(), CacheError>;
}

/// Per-client cache switch
#[derive(Clone, Default)]
pub struct CacheSettings {
    enabled: bool,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl CacheSettings {
    /// Caching turned off
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Caching turned on with the given backend
    pub fn enabled(cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            enabled: true,
            cache: Some(cache),
        }
    }

    /// Build settings from a flag and an optional backend
    pub fn new(enabled: bool, cache: Option<Arc<dyn ResponseCache>>) -> Self {
        Self { enabled, cache }
    }

    /// Whether lookups will be made
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.cache.is_some()
    }

    /// The backend to consult, `None` when caching is off
    pub fn port(&self) -> Option<&dyn ResponseCache> {
        if self.enabled {
            self.cache.as_deref()
        } else {
            None
        }
    }
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("enabled", &self.enabled)
            .field("has_backend", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_settings_expose_no_port() {
        let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new());

        assert!(CacheSettings::disabled().port().is_none());
        assert!(CacheSettings::new(false, Some(cache.clone())).port().is_none());
        assert!(CacheSettings::new(true, None).port().is_none());
        assert!(CacheSettings::enabled(cache).port().is_some());
    }

    #[test]
    fn test_entry_outcome_conversion() {
        let outcome = CompletionOutcome::Structured(serde_json::json!({"value": 4}));
        let entry = CacheEntry::from(outcome.clone());
        assert_eq!(CompletionOutcome::from(entry), outcome);
    }
}
