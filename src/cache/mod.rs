// ABOUTME: Cache abstraction for memoizing expensive external calls
// ABOUTME: Versioned cache keys and a pluggable bytes-oriented provider trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 food-grounder contributors

//! Cache port
//!
//! An injected, bytes-oriented cache with explicit TTLs - no process-wide
//! singleton, so tests run against an isolated in-memory stub. Keys are
//! built deterministically from `{purpose, version, subject}` and hashed, so
//! bumping the matcher's version tag safely invalidates entries produced by
//! older matching logic.

/// In-memory cache provider
pub mod memory;

use crate::errors::AppResult;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Pluggable cache backend over opaque byte values
#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    /// Retrieve a value, `None` on miss or expiry
    ///
    /// # Errors
    ///
    /// Returns an error if the backend itself fails
    async fn get(&self, key: &CacheKey) -> AppResult<Option<Vec<u8>>>;

    /// Store a value with a TTL
    ///
    /// # Errors
    ///
    /// Returns an error if the backend itself fails
    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> AppResult<()>;
}

/// Deterministic, versioned cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// What kind of value is cached ("food-search", ...)
    pub purpose: String,
    /// Version tag of the logic producing the value
    pub version: String,
    /// Normalized query or other subject identifier
    pub subject: String,
}

impl CacheKey {
    /// Build a key from its parts
    #[must_use]
    pub fn new(
        purpose: impl Into<String>,
        version: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            purpose: purpose.into(),
            version: version.into(),
            subject: subject.into(),
        }
    }

    /// Stable digest suitable as a storage key
    ///
    /// Parts are length-prefixed so `("p", "v:x", "y")` and `("p", "v",
    /// "x:y")` cannot collide.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [&self.purpose, &self.version, &self.subject] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.purpose, self.version, self.subject)
    }
}

/// TTL settings for cached resources
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheTtlConfig {
    /// Food-search result TTL in seconds (default: 7 days, the data is stable)
    pub search_secs: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            search_secs: 7 * 24 * 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let a = CacheKey::new("food-search", "match-v2", "diet cola");
        let b = CacheKey::new("food-search", "match-v2", "diet cola");
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_version_bump_changes_digest() {
        let old = CacheKey::new("food-search", "match-v1", "diet cola");
        let new = CacheKey::new("food-search", "match-v2", "diet cola");
        assert_ne!(old.digest(), new.digest());
    }

    #[test]
    fn test_part_boundaries_cannot_collide() {
        let a = CacheKey::new("p", "v:x", "y");
        let b = CacheKey::new("p", "v", "x:y");
        // Identical Display rendering, but the digest length-prefixes parts
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a.digest(), b.digest());
    }
}
