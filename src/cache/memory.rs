// ABOUTME: In-memory cache implementation with LRU eviction and TTL support
// ABOUTME: Entries expire lazily on read; capacity is bounded by the LRU
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

use super::{Cache, CacheKey};
use crate::errors::AppResult;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// In-memory cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded in-memory cache with LRU eviction and lazy TTL expiry
///
/// Reads on unrelated keys never block each other beyond the shared lock;
/// concurrent in-flight computation de-dup lives in the
/// [`crate::external::cached::CachedFoodSearch`] wrapper, keeping this
/// provider a plain store.
#[derive(Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
}

impl InMemoryCache {
    /// Capacity used when the requested capacity is zero
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a cache bounded to `max_entries`
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Number of live entries (expired entries may still be counted)
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> AppResult<Option<Vec<u8>>> {
        let digest = key.digest();
        let mut store = self.store.write().await;
        match store.get(&digest) {
            Some(entry) if entry.is_expired() => {
                store.pop(&digest);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.data.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        let mut store = self.store.write().await;
        store.put(key.digest(), CacheEntry::new(value, ttl));
        Ok(())
    }
}
