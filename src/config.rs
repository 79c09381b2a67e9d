//! Configuration Module
//!
//! Selects and configures a cache backend from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::cache::{AnyCache, MemcacheCache, MemoryCache, NoCache, RedisCache};
use crate::error::{CacheError, Result};

// == Backend Kind ==
/// Which backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Memory,
    Redis,
    Memcache,
    None,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            "memcache" | "memcached" => Ok(BackendKind::Memcache),
            "none" | "nocache" | "disabled" => Ok(BackendKind::None),
            other => Err(CacheError::Config(format!("unknown cache backend '{}'", other))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Memory => "memory",
            BackendKind::Redis => "redis",
            BackendKind::Memcache => "memcache",
            BackendKind::None => "none",
        };
        f.write_str(name)
    }
}

// == Redis Config ==
/// Connection settings for the Redis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Server address as `host:port`
    pub addr: String,
    /// Password, empty for none
    pub password: String,
    /// Logical database index
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            password: String::new(),
            db: 0,
        }
    }
}

// == Config ==
/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend to construct
    pub backend: BackendKind,
    /// Redis settings, used when `backend` is Redis
    pub redis: RedisConfig,
    /// Memcached server, used when `backend` is Memcache
    pub memcache_server: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - memory, redis, memcache or none (default: memory)
    /// - `REDIS_ADDR` - Redis address (default: 127.0.0.1:6379)
    /// - `REDIS_PASSWORD` - Redis password (default: empty)
    /// - `REDIS_DB` - Redis database index (default: 0)
    /// - `MEMCACHE_SERVER` - Memcached address (default: 127.0.0.1:11211)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backend),
            redis: RedisConfig {
                addr: env::var("REDIS_ADDR").unwrap_or(defaults.redis.addr),
                password: env::var("REDIS_PASSWORD").unwrap_or(defaults.redis.password),
                db: env::var("REDIS_DB")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.redis.db),
            },
            memcache_server: env::var("MEMCACHE_SERVER").unwrap_or(defaults.memcache_server),
        }
    }

    /// Constructs the configured backend, connecting if it is networked.
    pub async fn build(&self) -> Result<AnyCache> {
        info!(backend = %self.backend, "building cache backend");

        let cache = match self.backend {
            BackendKind::Memory => AnyCache::from(MemoryCache::new()),
            BackendKind::Redis => AnyCache::from(RedisCache::from_config(&self.redis).await?),
            BackendKind::Memcache => {
                AnyCache::from(MemcacheCache::connect(&self.memcache_server).await?)
            }
            BackendKind::None => AnyCache::from(NoCache::new()),
        };
        Ok(cache)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            redis: RedisConfig::default(),
            memcache_server: "127.0.0.1:11211".to_string(),
        }
    }
}
