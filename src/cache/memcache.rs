//! Memcached Cache Module
//!
//! `CacheRepo` over the memcached protocol. The protocol only knows scalar
//! get/set/delete/incr, so lists are emulated with the shared encoding in
//! [`crate::cache::list`] and key search is rejected.
//!
//! List updates are a plain read-modify-write with no lock or CAS: two
//! concurrent pushes to one key can race and the last write wins.
//!
//! Counters rely on the native `incr`, so a key holding a non-numeric value
//! fails to increment instead of restarting from zero.

use std::sync::Arc;
use std::time::Duration;

use ::memcache::{Client, MemcacheError};
use async_trait::async_trait;
use tracing::debug;

use crate::cache::list::{decode_list, encode_counter, encode_list, remove_matches, slice_range};
use crate::cache::repo::{CacheRepo, PING_KEY};
use crate::error::{CacheError, Result};

/// Longest relative expiry memcached accepts; larger values are read as Unix timestamps.
const MAX_RELATIVE_EXPIRATION_SECS: u64 = 60 * 60 * 24 * 30;

// == Memcache Cache ==
/// Memcached-backed repository.
///
/// The underlying client is blocking, so every call runs on tokio's
/// blocking pool.
#[derive(Clone)]
pub struct MemcacheCache {
    client: Arc<Client>,
}

impl std::fmt::Debug for MemcacheCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheCache").finish_non_exhaustive()
    }
}

impl MemcacheCache {
    // == Constructor ==
    /// Connects to a memcached server given as `host:port` or a `memcache://` URL.
    pub async fn connect(server: &str) -> Result<Self> {
        let url = server_url(server);
        debug!(server = %url, "connecting to memcached");

        let client = tokio::task::spawn_blocking(move || Client::connect(url)).await??;
        Ok(Self::from_client(client))
    }

    /// Wraps an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Runs a client call on the blocking pool.
    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Client) -> std::result::Result<T, MemcacheError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        let result = tokio::task::spawn_blocking(move || op(client.as_ref())).await?;
        Ok(result?)
    }

    /// Reads the list under `key`, applies `op` and writes the result back.
    ///
    /// An empty result deletes the key.
    async fn list_op<F>(&self, key: &str, op: F) -> Result<()>
    where
        F: FnOnce(Vec<String>) -> Vec<String> + Send + 'static,
    {
        let key = key.to_string();
        self.run(move |client| {
            let values = client
                .get::<Vec<u8>>(&key)?
                .map(|raw| decode_list(&raw))
                .unwrap_or_default();

            let values = op(values);
            if values.is_empty() {
                client.delete(&key)?;
                return Ok(());
            }
            client.set(&key, encode_list(&values).as_slice(), 0)
        })
        .await
    }
}

/// Normalizes a server address into the URL form the client expects.
fn server_url(server: &str) -> String {
    if server.contains("://") {
        server.to_string()
    } else {
        format!("memcache://{}", server)
    }
}

/// Converts a TTL into a memcached expiration field.
///
/// Partial seconds round up so that a short TTL never turns into "no
/// expiry". TTLs past the protocol's 30 day limit become absolute Unix times.
fn expiration_secs(ttl: Duration) -> u32 {
    if ttl.is_zero() {
        return 0;
    }

    let mut secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs += 1;
    }
    if secs > MAX_RELATIVE_EXPIRATION_SECS {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        secs = now.saturating_add(secs);
    }
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// Seeds an absent counter with 0 and increments it natively.
///
/// A non-numeric value is not read as zero here: memcached rejects the
/// `incr` and the error is returned.
fn increment_in_place(client: &Client, key: &str) -> std::result::Result<i64, MemcacheError> {
    // incr fails on a missing key, so seed it first
    if client.get::<Vec<u8>>(key)?.is_none() {
        client.set(key, encode_counter(0).as_slice(), 0)?;
    }
    let value = client.increment(key, 1)?;
    Ok(i64::try_from(value).unwrap_or(i64::MAX))
}

#[async_trait]
impl CacheRepo for MemcacheCache {
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_vec());
        let expiration = expiration_secs(ttl);
        self.run(move |client| client.set(&key, value.as_slice(), expiration))
            .await
    }

    async fn store_without_ttl(&self, key: &str, value: &[u8]) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_vec());
        self.run(move |client| client.set(&key, value.as_slice(), 0))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        self.run(move |client| client.get::<Vec<u8>>(&key)).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        // `false` means the key was absent, which is fine
        self.run(move |client| client.delete(&key).map(|_| ())).await
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let key = key.to_string();
        self.run(move |client| increment_in_place(client, &key)).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64> {
        let value = self.increment(key).await?;

        // Second round trip: re-store the counter with the expiry attached.
        let key = key.to_string();
        let expiration = expiration_secs(ttl);
        self.run(move |client| client.set(&key, encode_counter(value).as_slice(), expiration))
            .await?;
        Ok(value)
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<()> {
        let head = String::from_utf8_lossy(value).into_owned();
        self.list_op(key, move |mut values| {
            values.insert(0, head);
            values
        })
        .await
    }

    async fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        let key = key.to_string();
        let raw = self.run(move |client| client.get::<Vec<u8>>(&key)).await?;
        Ok(raw
            .map(|raw| slice_range(&decode_list(&raw), start, end))
            .unwrap_or_default())
    }

    async fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<()> {
        self.list_op(key, move |values| slice_range(&values, start, end))
            .await
    }

    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> Result<()> {
        let target = String::from_utf8_lossy(value).into_owned();
        self.list_op(key, move |values| remove_matches(values, count, &target))
            .await
    }

    async fn keys_by_pattern(&self, _pattern: &str) -> Result<Vec<String>> {
        Err(CacheError::Unsupported(
            "memcached has no key listing; pattern search is unavailable".to_string(),
        ))
    }

    async fn values_by_keys(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let keys = keys.to_vec();
        self.run(move |client| {
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let mut found = client.gets::<Vec<u8>>(&refs)?;
            Ok(keys.iter().map(|key| found.remove(key)).collect())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        // Pooled connections are released when the client is dropped.
        debug!("memcache repository closed");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.run(|client| client.get::<Vec<u8>>(PING_KEY).map(|_| ()))
            .await
    }
}
