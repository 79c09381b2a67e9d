//! Backend Selection
//!
//! `AnyCache` holds whichever backend was chosen at construction and
//! forwards every operation to it with a `match`, so the choice costs no
//! virtual call and never changes between calls.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheRepo, MemcacheCache, MemoryCache, NoCache, RedisCache};
use crate::error::Result;

/// One of the supported backends, fixed when the value is built.
#[derive(Debug)]
pub enum AnyCache {
    Memory(MemoryCache),
    Redis(RedisCache),
    Memcache(MemcacheCache),
    Disabled(NoCache),
}

impl AnyCache {
    /// Short backend name, as used in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            AnyCache::Memory(_) => "memory",
            AnyCache::Redis(_) => "redis",
            AnyCache::Memcache(_) => "memcache",
            AnyCache::Disabled(_) => "none",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $cache:ident => $call:expr) => {
        match $self {
            AnyCache::Memory($cache) => $call,
            AnyCache::Redis($cache) => $call,
            AnyCache::Memcache($cache) => $call,
            AnyCache::Disabled($cache) => $call,
        }
    };
}

#[async_trait]
impl CacheRepo for AnyCache {
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        dispatch!(self, c => c.store(key, value, ttl).await)
    }

    async fn store_without_ttl(&self, key: &str, value: &[u8]) -> Result<()> {
        dispatch!(self, c => c.store_without_ttl(key, value).await)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        dispatch!(self, c => c.get(key).await)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        dispatch!(self, c => c.delete(key).await)
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        dispatch!(self, c => c.increment(key).await)
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64> {
        dispatch!(self, c => c.increment_with_ttl(key, ttl).await)
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<()> {
        dispatch!(self, c => c.lpush(key, value).await)
    }

    async fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        dispatch!(self, c => c.lrange(key, start, end).await)
    }

    async fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<()> {
        dispatch!(self, c => c.ltrim(key, start, end).await)
    }

    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> Result<()> {
        dispatch!(self, c => c.lrem(key, count, value).await)
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        dispatch!(self, c => c.keys_by_pattern(pattern).await)
    }

    async fn values_by_keys(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        dispatch!(self, c => c.values_by_keys(keys).await)
    }

    async fn close(&self) -> Result<()> {
        dispatch!(self, c => c.close().await)
    }

    async fn ping(&self) -> Result<()> {
        dispatch!(self, c => c.ping().await)
    }
}

impl From<MemoryCache> for AnyCache {
    fn from(cache: MemoryCache) -> Self {
        AnyCache::Memory(cache)
    }
}

impl From<RedisCache> for AnyCache {
    fn from(cache: RedisCache) -> Self {
        AnyCache::Redis(cache)
    }
}

impl From<MemcacheCache> for AnyCache {
    fn from(cache: MemcacheCache) -> Self {
        AnyCache::Memcache(cache)
    }
}

impl From<NoCache> for AnyCache {
    fn from(cache: NoCache) -> Self {
        AnyCache::Disabled(cache)
    }
}
