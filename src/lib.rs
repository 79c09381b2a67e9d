//! Cache Repo - one caching contract over several storage backends
//!
//! Provides Redis, Memcached, in-process and no-op implementations of
//! [`CacheRepo`], plus cache-aside helpers that wrap an expensive lookup.

pub mod aside;
pub mod cache;
pub mod config;
pub mod error;

pub use aside::{
    get_from_cache, get_from_cache_with_dynamic_ttl, CacheAside, Codec, Expiration, JsonCodec,
};
pub use cache::{AnyCache, CacheRepo, MemcacheCache, MemoryCache, NoCache, RedisCache};
pub use config::{BackendKind, Config, RedisConfig};
pub use error::{CacheError, Result};
