//! In-process cache backed by a concurrent map

use super::{CacheEntry, CacheError, CacheKey, ResponseCache};
use async_trait::async_trait;
use dashmap::DashMap;

/// Unbounded in-memory response cache
///
/// Concurrent writers to the same key race; the last write wins.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(
        &self,
        key: &CacheKey,
        request_id: &str,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let entry = self.entries.get(key).map(|entry| entry.value().clone());
        tracing::trace!(cache_key = %key, request_id, found = entry.is_some(), "memory cache lookup");
        Ok(entry)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: CacheEntry,
        request_id: &str,
    ) -> Result<(), CacheError> {
        tracing::trace!(cache_key = %key, request_id, "memory cache store");
        self.entries.insert(key.clone(), value);
        Ok(())
    }
}
