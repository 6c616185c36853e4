// ABOUTME: Caching decorator around any FoodSearch implementation
// ABOUTME: Versioned cache keys plus de-duplication of identical in-flight lookups
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Cached food search
//!
//! Wraps a [`FoodSearch`] port with the injected [`Cache`]. Results are
//! stored under versioned keys so bumping the matcher version invalidates
//! entries from older logic. Concurrent identical lookups share one upstream
//! call (get-or-compute): the first caller computes, the rest await the same
//! cell. Readers of unrelated keys never wait on each other beyond the
//! short in-flight map lock.

use super::food_search::FoodSearch;
use crate::cache::{Cache, CacheKey};
use crate::errors::AppResult;
use crate::models::FoodCandidate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Purpose tag for food-search cache keys
const CACHE_PURPOSE: &str = "food-search";

type InflightCell = Arc<OnceCell<Vec<FoodCandidate>>>;

/// Caching decorator over a food search port
pub struct CachedFoodSearch {
    inner: Arc<dyn FoodSearch>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    version: String,
    inflight: Mutex<HashMap<String, InflightCell>>,
}

impl CachedFoodSearch {
    /// Wrap `inner` with the given cache, TTL, and logic-version tag
    #[must_use]
    pub fn new(
        inner: Arc<dyn FoodSearch>,
        cache: Arc<dyn Cache>,
        ttl: Duration,
        version: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            cache,
            ttl,
            version: version.into(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn key(&self, query: &str) -> CacheKey {
        CacheKey::new(CACHE_PURPOSE, self.version.clone(), query.to_lowercase())
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Vec<FoodCandidate>> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(candidates) => {
                    debug!(key = %key, "food search cache hit");
                    Some(candidates)
                }
                Err(error) => {
                    debug!(key = %key, %error, "cache payload undecodable; treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                debug!(key = %key, %error, "cache read failed; treating as miss");
                None
            }
        }
    }

    async fn compute_and_store(
        &self,
        query: &str,
        key: &CacheKey,
    ) -> AppResult<Vec<FoodCandidate>> {
        // A cell created just after another caller finished may find the
        // value already cached; re-checking avoids a duplicate upstream call
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }
        let candidates = self.inner.search(query).await?;
        match serde_json::to_vec(&candidates) {
            Ok(bytes) => {
                if let Err(error) = self.cache.set(key, bytes, self.ttl).await {
                    debug!(key = %key, %error, "cache write failed; result still served");
                }
            }
            Err(error) => {
                debug!(key = %key, %error, "result not serializable for cache");
            }
        }
        Ok(candidates)
    }
}

#[async_trait::async_trait]
impl FoodSearch for CachedFoodSearch {
    async fn search(&self, query: &str) -> AppResult<Vec<FoodCandidate>> {
        let key = self.key(query);
        if let Some(hit) = self.lookup(&key).await {
            return Ok(hit);
        }

        // Get-or-compute: identical concurrent queries share one cell and
        // therefore one upstream call.
        let cell = {
            let mut inflight = self.inflight.lock().await;
            inflight.entry(key.digest()).or_default().clone()
        };

        let result = cell
            .get_or_try_init(|| self.compute_and_store(query, &key))
            .await
            .map(Clone::clone);

        // Drop the cell so a failed computation can be retried later and a
        // successful one is served from the real cache next time.
        {
            let mut inflight = self.inflight.lock().await;
            inflight.remove(&key.digest());
        }

        result
    }
}
