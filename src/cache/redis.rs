//! Redis Cache Module
//!
//! `CacheRepo` backed by Redis. Every operation maps onto a native command,
//! so this adapter only translates arguments and results.

use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use tracing::debug;

use crate::cache::repo::CacheRepo;
use crate::config::RedisConfig;
use crate::error::Result;

// == Redis Cache ==
/// Redis-backed repository sharing one auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    // == Constructor ==
    /// Connects to `addr` (`host:port`), authenticating with `password` when
    /// non-empty and selecting logical database `db`.
    pub async fn connect(addr: &str, password: &str, db: i64) -> Result<Self> {
        debug!(addr, db, "connecting to redis");

        let client = ::redis::Client::open(connection_url(addr, password, db))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Connects using the settings from a [`RedisConfig`].
    pub async fn from_config(config: &RedisConfig) -> Result<Self> {
        Self::connect(&config.addr, &config.password, config.db).await
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

fn connection_url(addr: &str, password: &str, db: i64) -> String {
    if password.is_empty() {
        format!("redis://{}/{}", addr, db)
    } else {
        format!("redis://:{}@{}/{}", urlencoding::encode(password), addr, db)
    }
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CacheRepo for RedisCache {
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return self.store_without_ttl(key, value).await;
        }

        ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async::<_, ()>(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn store_without_ttl(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn().set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.conn().get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.conn().del::<_, ()>(key).await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        Ok(self.conn().incr::<_, _, i64>(key, 1).await?)
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64> {
        if ttl.is_zero() {
            return self.increment(key).await;
        }

        // Pipelined, not MULTI: another client can interleave between the two.
        let (value,): (i64,) = ::redis::pipe()
            .cmd("INCR")
            .arg(key)
            .cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .ignore()
            .query_async(&mut self.conn())
            .await?;
        Ok(value)
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn().lpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        Ok(self
            .conn()
            .lrange::<_, Vec<String>>(key, start as isize, end as isize)
            .await?)
    }

    async fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<()> {
        self.conn()
            .ltrim::<_, ()>(key, start as isize, end as isize)
            .await?;
        Ok(())
    }

    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> Result<()> {
        self.conn()
            .lrem::<_, _, ()>(key, count as isize, value)
            .await?;
        Ok(())
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let mut iter = conn.scan_match::<_, String>(pattern).await?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn values_by_keys(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        // Explicit MGET: the typed helper switches to GET for a single key.
        Ok(::redis::cmd("MGET")
            .arg(keys)
            .query_async::<_, Vec<Option<Vec<u8>>>>(&mut self.conn())
            .await?)
    }

    async fn close(&self) -> Result<()> {
        // The managed connection closes when the last clone is dropped.
        debug!("redis repository closed");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        ::redis::cmd("PING")
            .query_async::<_, String>(&mut self.conn())
            .await?;
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url_without_password() {
        assert_eq!(connection_url("localhost:6379", "", 0), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_url_encodes_password() {
        assert_eq!(
            connection_url("cache:6380", "p@ss/word", 3),
            "redis://:p%40ss%2Fword@cache:6380/3"
        );
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    // The tests below need a redis server on localhost:6379 and use db 15.

    async fn connect() -> RedisCache {
        RedisCache::connect("localhost:6379", "", 15).await.unwrap()
    }

    #[tokio::test]
    #[ignore]
    async fn test_basic_operations() {
        let cache = connect().await;

        cache.store("rd:test_key", b"test_value", Duration::from_secs(60)).await.unwrap();
        assert_eq!(
            cache.get("rd:test_key").await.unwrap(),
            Some(b"test_value".to_vec())
        );

        cache.delete("rd:test_key").await.unwrap();
        cache.delete("rd:test_key").await.unwrap();
        assert_eq!(cache.get("rd:test_key").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_increment() {
        let cache = connect().await;
        cache.delete("rd:counter").await.unwrap();

        assert_eq!(cache.increment("rd:counter").await.unwrap(), 1);
        assert_eq!(
            cache.increment_with_ttl("rd:counter", Duration::from_secs(60)).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_list_operations() {
        let cache = connect().await;
        cache.delete("rd:list").await.unwrap();

        cache.lpush("rd:list", b"a").await.unwrap();
        cache.lpush("rd:list", b"b").await.unwrap();
        cache.lpush("rd:list", b"a").await.unwrap();
        assert_eq!(cache.lrange("rd:list", 0, -1).await.unwrap(), vec!["a", "b", "a"]);

        cache.lrem("rd:list", -1, b"a").await.unwrap();
        assert_eq!(cache.lrange("rd:list", 0, -1).await.unwrap(), vec!["a", "b"]);

        cache.ltrim("rd:list", 0, 0).await.unwrap();
        assert_eq!(cache.lrange("rd:list", 0, -1).await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_keys_and_values() {
        let cache = connect().await;
        cache.store_without_ttl("rd:kp:1", b"one").await.unwrap();
        cache.store_without_ttl("rd:kp:2", b"two").await.unwrap();

        let mut keys = cache.keys_by_pattern("rd:kp:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["rd:kp:1", "rd:kp:2"]);

        let values = cache
            .values_by_keys(&["rd:kp:2".to_string(), "rd:kp:missing".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(b"two".to_vec()), None]);

        cache.ping().await.unwrap();
    }
}
