//! Prompt response caching with a fixed TTL.

pub mod response_cache;

pub use response_cache::{CacheEntry, CacheKey, CacheStats, ResponseCache, CACHE_TTL_SECS};
