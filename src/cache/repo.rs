//! Cache Repository Contract
//!
//! The operation set every backend implements with the same observable
//! semantics. Backends without a native primitive emulate it, except key
//! search, which may fail with [`CacheError::Unsupported`].
//!
//! [`CacheError::Unsupported`]: crate::error::CacheError::Unsupported

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Key probed by health checks. Absence counts as healthy.
pub const PING_KEY: &str = "__ping__";

// == Cache Repository Trait ==
/// Capability interface shared by every cache backend.
///
/// All methods take `&self`; implementations rely on interior mutability or
/// on the concurrency guarantees of their protocol client.
#[async_trait]
pub trait CacheRepo: Send + Sync {
    /// Upserts `key` so that it expires `ttl` from now.
    ///
    /// A zero `ttl` is backend specific; use
    /// [`store_without_ttl`](Self::store_without_ttl) for entries that should
    /// never expire.
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Upserts `key` with no expiry.
    async fn store_without_ttl(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Fetches the value under `key`.
    ///
    /// `Ok(None)` means the key is absent; errors are reserved for transport
    /// or backend failures.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Adds one to the counter under `key`, treating absence as zero.
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Increments like [`increment`](Self::increment), then sets the expiry.
    ///
    /// The two steps are not atomic across backends: the expiry applies to
    /// whatever value the key holds when the second step runs.
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64>;

    /// Prepends `value` to the list under `key`, creating the list if needed.
    ///
    /// List elements are text. On emulating backends, bytes that are not
    /// valid UTF-8 are replaced with U+FFFD before storing.
    async fn lpush(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Returns the inclusive slice `[start, end]` of the list under `key`.
    ///
    /// Negative indices count from the end of the list. An absent key or an
    /// empty range yields an empty vector.
    async fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>>;

    /// Keeps only `[start, end]` of the list, deleting the key if nothing remains.
    async fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<()>;

    /// Removes occurrences of `value` from the list.
    ///
    /// `count > 0` removes from the head, `count < 0` from the tail and
    /// `count == 0` removes every occurrence. Deletes the key if the list
    /// ends up empty. On emulating backends `value` is compared as lossy
    /// UTF-8 text, the same conversion [`lpush`](Self::lpush) applies.
    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> Result<()>;

    /// Lists keys matching a shell-style glob.
    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>>;

    /// Fetches several keys at once, one slot per input key in input order.
    async fn values_by_keys(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Releases the backend's resources.
    async fn close(&self) -> Result<()>;

    /// Checks that the backend is reachable without mutating it.
    async fn ping(&self) -> Result<()>;
}
