//! Gateway response cache with TTL expiry.
//!
//! Entries are keyed by the normalized prompt (see [`CacheKey`]) and live for
//! [`CACHE_TTL_SECS`]. There is no capacity bound and no persistence: an
//! entry is either fresh, or stale and ignored (and lazily removed) on lookup.
//!
//! The store is a [`DashMap`], so lookups and per-key replacement are atomic
//! with respect to concurrent callers. Writes are last-write-wins.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::gateway::Citation;

/// Maximum age of a cache entry, in seconds.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Normalized prompt used for cache lookups.
///
/// Prompts that differ only in case or surrounding whitespace map to the same
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_prompt(prompt: &str) -> Self {
        Self(prompt.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix for logs, so raw prompts never reach the log stream.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.0.as_bytes());
        hex::encode(&hash[..4])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single cached gateway response. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub response_text: String,
    /// Citations in backend order.
    pub citations: Vec<Citation>,
    pub stored_at: DateTime<Utc>,
}

/// In-memory response cache.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            ttl: Duration::seconds(CACHE_TTL_SECS),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the entry for `key` if it is still fresh (`age <= TTL`).
    ///
    /// A stale entry is never returned. It is removed unless a concurrent
    /// writer has already replaced it with a fresh one.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if !self.is_expired(&entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value().clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(key = %key.digest(), "Cache entry expired, removing");
            self.entries.remove_if(key, |_, entry| self.is_expired(entry, now));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Return the stored entry for `key` regardless of age, without touching
    /// the hit/miss counters.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Store a response under `key` stamped with the current time.
    pub fn put(
        &self,
        key: CacheKey,
        response_text: String,
        citations: Vec<Citation>,
    ) -> CacheEntry {
        let entry = CacheEntry {
            response_text,
            citations,
            stored_at: self.clock.now(),
        };
        debug!(key = %key.digest(), citations = entry.citations.len(), "Caching response");
        self.entries.insert(key, entry.clone());
        entry
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including stale ones not yet removed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) > self.ttl
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing fresh.
    pub misses: u64,
}
