//! No-Op Cache Module
//!
//! A `CacheRepo` that stores nothing. Swapping it in disables caching
//! without touching call sites.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::repo::CacheRepo;
use crate::error::Result;

/// Repository whose operations all succeed without effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl NoCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheRepo for NoCache {
    async fn store(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn store_without_ttl(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn increment(&self, _key: &str) -> Result<i64> {
        Ok(0)
    }

    async fn increment_with_ttl(&self, _key: &str, _ttl: Duration) -> Result<i64> {
        Ok(0)
    }

    async fn lpush(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn lrange(&self, _key: &str, _start: i64, _end: i64) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn ltrim(&self, _key: &str, _start: i64, _end: i64) -> Result<()> {
        Ok(())
    }

    async fn lrem(&self, _key: &str, _count: i64, _value: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn keys_by_pattern(&self, _pattern: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn values_by_keys(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        Ok(vec![None; keys.len()])
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
