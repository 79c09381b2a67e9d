//! Cache-Aside Helpers
//!
//! Wraps an expensive lookup so that its result is served from a
//! [`CacheRepo`] when present and written back after a miss.
//!
//! Cache infrastructure problems never fail the call: an unreadable cache,
//! an undecodable entry, or a failed write all degrade to "act as if the
//! cache were empty" and are only logged. The one error returned to the
//! caller is the lookup's own.
//!
//! Concurrent misses on one key are not coalesced; every caller runs the
//! lookup and the last write wins.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::cache::CacheRepo;
use crate::error::Result;

// == Expiration Policy ==
/// What to do with a freshly fetched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Return the value without caching it.
    Skip,
    /// Cache the value with no expiry.
    Never,
    /// Cache the value for the given duration.
    After(Duration),
}

impl Expiration {
    /// Maps a signed second count onto a policy: negative skips, zero never
    /// expires, positive expires after that many seconds.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            s if s < 0 => Expiration::Skip,
            0 => Expiration::Never,
            s => Expiration::After(Duration::from_secs(s.unsigned_abs())),
        }
    }
}

impl From<chrono::Duration> for Expiration {
    fn from(ttl: chrono::Duration) -> Self {
        if ttl < chrono::Duration::zero() {
            Expiration::Skip
        } else if ttl.is_zero() {
            Expiration::Never
        } else {
            // Positive, so the conversion cannot fail.
            ttl.to_std().map(Expiration::After).unwrap_or(Expiration::Skip)
        }
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiration::Never
        } else {
            Expiration::After(ttl)
        }
    }
}

// == Codec ==
/// Reversible serialization between values and cached bytes.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON encoding via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// == Cache Aside ==
/// Cache-aside reader bound to a repository and a key prefix.
///
/// Keys take the form `prefix:id`, with `id` rendered through `Display`.
#[derive(Debug)]
pub struct CacheAside<'r, R: ?Sized, C = JsonCodec> {
    repo: &'r R,
    prefix: String,
    codec: C,
}

impl<'r, R> CacheAside<'r, R, JsonCodec>
where
    R: CacheRepo + ?Sized,
{
    /// Creates a reader using JSON for stored values.
    pub fn new(repo: &'r R, prefix: impl Into<String>) -> Self {
        Self {
            repo,
            prefix: prefix.into(),
            codec: JsonCodec,
        }
    }
}

impl<'r, R, C> CacheAside<'r, R, C>
where
    R: CacheRepo + ?Sized,
    C: Codec,
{
    /// Swaps the serialization format.
    pub fn with_codec<C2: Codec>(self, codec: C2) -> CacheAside<'r, R, C2> {
        CacheAside {
            repo: self.repo,
            prefix: self.prefix,
            codec,
        }
    }

    /// Builds the cache key for `id`.
    pub fn key<I: Display>(&self, id: &I) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Returns the cached value for `id`, or runs `source` and caches its
    /// result according to `expiration`.
    ///
    /// A source error is returned as-is and nothing is cached. A source that
    /// finds nothing (`Ok(None)`) is not cached either.
    pub async fn fetch<T, I, E, F, Fut>(
        &self,
        id: I,
        expiration: Expiration,
        source: F,
    ) -> std::result::Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        I: Display,
        E: Display,
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
    {
        self.fetch_with_dynamic_ttl(id, |_: &T| expiration, source).await
    }

    /// Like [`fetch`](Self::fetch), but the policy is computed from the
    /// fetched value, so stable records can be kept longer than volatile ones.
    pub async fn fetch_with_dynamic_ttl<T, I, E, F, Fut, P>(
        &self,
        id: I,
        policy: P,
        source: F,
    ) -> std::result::Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        I: Display,
        E: Display,
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = std::result::Result<Option<T>, E>>,
        P: FnOnce(&T) -> Expiration,
    {
        let key = self.key(&id);

        if let Some(value) = self.lookup(&key).await {
            return Ok(Some(value));
        }

        let value = match source(id).await {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(None),
            Err(err) => {
                error!(
                    key = %key,
                    site = "source",
                    error = %err,
                    "cache-aside source lookup failed"
                );
                return Err(err);
            }
        };

        let bytes = match self.codec.encode(&value) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(
                    key = %key,
                    site = "encode",
                    error = %err,
                    "cache-aside could not encode value"
                );
                return Ok(Some(value));
            }
        };

        let stored = match policy(&value) {
            Expiration::Skip => Ok(()),
            Expiration::Never => self.repo.store_without_ttl(&key, &bytes).await,
            Expiration::After(ttl) => self.repo.store(&key, &bytes, ttl).await,
        };
        if let Err(err) = stored {
            error!(
                key = %key,
                site = "store",
                error = %err,
                "cache-aside could not store value"
            );
        }

        Ok(Some(value))
    }

    /// Reads and decodes `key`; any failure counts as a miss.
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.repo.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                error!(
                    key = %key,
                    site = "get",
                    error = %err,
                    "cache-aside read failed, falling back to source"
                );
                return None;
            }
        };

        match self.codec.decode(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    key = %key,
                    site = "decode",
                    error = %err,
                    "cache-aside entry undecodable, falling back to source"
                );
                None
            }
        }
    }
}

// == Free Functions ==
/// Fixed-TTL cache-aside read with JSON encoding.
///
/// See [`CacheAside::fetch`].
pub async fn get_from_cache<R, T, I, E, F, Fut>(
    repo: &R,
    id: I,
    prefix: &str,
    expiration: impl Into<Expiration>,
    source: F,
) -> std::result::Result<Option<T>, E>
where
    R: CacheRepo + ?Sized,
    T: Serialize + DeserializeOwned,
    I: Display,
    E: Display,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = std::result::Result<Option<T>, E>>,
{
    CacheAside::new(repo, prefix)
        .fetch(id, expiration.into(), source)
        .await
}

/// Cache-aside read whose policy depends on the fetched value, with JSON encoding.
///
/// See [`CacheAside::fetch_with_dynamic_ttl`].
pub async fn get_from_cache_with_dynamic_ttl<R, T, I, E, F, Fut, P>(
    repo: &R,
    id: I,
    prefix: &str,
    policy: P,
    source: F,
) -> std::result::Result<Option<T>, E>
where
    R: CacheRepo + ?Sized,
    T: Serialize + DeserializeOwned,
    I: Display,
    E: Display,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = std::result::Result<Option<T>, E>>,
    P: FnOnce(&T) -> Expiration,
{
    CacheAside::new(repo, prefix)
        .fetch_with_dynamic_ttl(id, policy, source)
        .await
}
