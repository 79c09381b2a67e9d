//! Cache Module
//!
//! The repository contract and its backends: in-process, Redis, Memcached
//! and a no-op stand-in.

mod any;
mod entry;
pub mod list;
mod memcache;
mod memory;
mod noop;
mod redis;
mod repo;


// Re-export public types
pub use any::AnyCache;
pub use entry::CacheEntry;
pub use memcache::MemcacheCache;
pub use memory::MemoryCache;
pub use noop::NoCache;
pub use redis::RedisCache;
pub use repo::{CacheRepo, PING_KEY};
