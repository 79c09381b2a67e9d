//! In-Process Cache Module
//!
//! A `CacheRepo` kept entirely in memory. Lists and counters use the same
//! byte encoding as the emulating network backends. Expired entries are
//! reclaimed lazily when an operation touches them; there is no reaper.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::entry::CacheEntry;
use crate::cache::list::{
    decode_counter, decode_list, encode_counter, encode_list, remove_matches, slice_range,
};
use crate::cache::repo::CacheRepo;
use crate::error::{CacheError, Result};

/// Shell-style matching: `*` and `?` stop at `/`.
const KEY_MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

// == Memory Cache ==
/// In-process backend guarded by a single read/write lock.
///
/// Lookups share the lock; every mutation takes it exclusively.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet reclaimed.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Replaces the list under `key` with `values`, removing the key when empty.
    fn put_list(entries: &mut HashMap<String, CacheEntry>, key: &str, values: &[String]) {
        if values.is_empty() {
            entries.remove(key);
        } else {
            entries.insert(key.to_string(), CacheEntry::persistent(encode_list(values)));
        }
    }

    fn next_counter(entries: &mut HashMap<String, CacheEntry>, key: &str) -> i64 {
        evict_if_expired(entries, key);
        let current = entries
            .get(key)
            .map(|entry| decode_counter(&entry.value))
            .unwrap_or(0);
        current.saturating_add(1)
    }
}

/// Drops the entry under `key` if its expiry has passed.
fn evict_if_expired(entries: &mut HashMap<String, CacheEntry>, key: &str) {
    if entries.get(key).is_some_and(CacheEntry::is_expired) {
        entries.remove(key);
    }
}

fn live_list(entries: &HashMap<String, CacheEntry>, key: &str) -> Vec<String> {
    entries
        .get(key)
        .filter(|entry| !entry.is_expired())
        .map(|entry| decode_list(&entry.value))
        .unwrap_or_default()
}

#[async_trait]
impl CacheRepo for MemoryCache {
    async fn store(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn store_without_ttl(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry::persistent(value.to_vec()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: reclaim under the exclusive lock. Another writer may have
        // replaced the entry in between, so check again.
        let mut entries = self.entries.write().await;
        evict_if_expired(&mut entries, key);
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut entries = self.entries.write().await;
        let next = Self::next_counter(&mut entries, key);
        entries.insert(key.to_string(), CacheEntry::persistent(encode_counter(next)));
        Ok(next)
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64> {
        let mut entries = self.entries.write().await;
        let next = Self::next_counter(&mut entries, key);
        entries.insert(key.to_string(), CacheEntry::new(encode_counter(next), ttl));
        Ok(next)
    }

    async fn lpush(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        evict_if_expired(&mut entries, key);

        let mut values = vec![String::from_utf8_lossy(value).into_owned()];
        values.extend(live_list(&entries, key));
        Self::put_list(&mut entries, key, &values);
        Ok(())
    }

    async fn lrange(&self, key: &str, start: i64, end: i64) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(slice_range(&live_list(&entries, key), start, end))
    }

    async fn ltrim(&self, key: &str, start: i64, end: i64) -> Result<()> {
        let mut entries = self.entries.write().await;
        evict_if_expired(&mut entries, key);
        if !entries.contains_key(key) {
            return Ok(());
        }

        let trimmed = slice_range(&live_list(&entries, key), start, end);
        Self::put_list(&mut entries, key, &trimmed);
        Ok(())
    }

    async fn lrem(&self, key: &str, count: i64, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        evict_if_expired(&mut entries, key);
        if !entries.contains_key(key) {
            return Ok(());
        }

        let target = String::from_utf8_lossy(value);
        let remaining = remove_matches(live_list(&entries, key), count, &target);
        Self::put_list(&mut entries, key, &remaining);
        Ok(())
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| CacheError::InvalidPattern(format!("{}: {}", pattern, e)))?;

        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| {
                !entry.is_expired() && matcher.matches_with(key, KEY_MATCH_OPTIONS)
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn values_by_keys(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(key)
                    .filter(|entry| !entry.is_expired())
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn close(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let cache = MemoryCache::new();

        cache.store("key1", b"value1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("key1").await.unwrap(), Some(b"value1".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_an_error() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let cache = MemoryCache::new();

        cache.store_without_ttl("key1", b"value1").await.unwrap();
        cache.store_without_ttl("key1", b"value2").await.unwrap();

        assert_eq!(cache.get("key1").await.unwrap(), Some(b"value2".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_get_reclaims_entry() {
        let cache = MemoryCache::new();

        cache.store("short", b"v", Duration::from_millis(20)).await.unwrap();
        assert!(cache.get("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert!(cache.is_empty().await, "Expired read should remove the entry");
    }

    #[tokio::test]
    async fn test_zero_ttl_store_is_immediately_absent() {
        let cache = MemoryCache::new();
        cache.store("k", b"v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_without_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.store_without_ttl("k", b"v").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = MemoryCache::new();

        cache.store_without_ttl("key1", b"value1").await.unwrap();
        cache.delete("key1").await.unwrap();
        cache.delete("key1").await.unwrap();
        cache.delete("never-existed").await.unwrap();

        assert_eq!(cache.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_sequence() {
        let cache = MemoryCache::new();

        assert_eq!(cache.increment("counter").await.unwrap(), 1);
        assert_eq!(cache.increment("counter").await.unwrap(), 2);
        assert_eq!(cache.get("counter").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_increment_existing_value() {
        let cache = MemoryCache::new();
        cache.store_without_ttl("counter", b"41").await.unwrap();
        assert_eq!(cache.increment("counter").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_increment_corrupt_value_counts_from_zero() {
        let cache = MemoryCache::new();
        cache.store_without_ttl("counter", b"not-a-number").await.unwrap();
        assert_eq!(cache.increment("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_clears_expiry() {
        let cache = MemoryCache::new();
        cache.increment_with_ttl("counter", Duration::from_millis(30)).await.unwrap();
        assert_eq!(cache.increment("counter").await.unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get("counter").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_increment_with_ttl_expires() {
        let cache = MemoryCache::new();

        assert_eq!(
            cache.increment_with_ttl("hits", Duration::from_secs(60)).await.unwrap(),
            1
        );
        assert_eq!(
            cache.increment_with_ttl("hits", Duration::from_millis(20)).await.unwrap(),
            2
        );

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.increment("hits").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lpush_and_lrange() {
        let cache = MemoryCache::new();

        cache.lpush("list", b"a").await.unwrap();
        cache.lpush("list", b"b").await.unwrap();

        assert_eq!(cache.lrange("list", 0, -1).await.unwrap(), strings(&["b", "a"]));
        assert_eq!(cache.lrange("list", -2, -1).await.unwrap(), strings(&["b", "a"]));
        assert_eq!(cache.lrange("list", -1, -1).await.unwrap(), strings(&["a"]));
    }

    #[tokio::test]
    async fn test_lrange_missing_and_inverted() {
        let cache = MemoryCache::new();
        assert!(cache.lrange("missing", 0, -1).await.unwrap().is_empty());

        cache.lpush("list", b"a").await.unwrap();
        assert!(cache.lrange("list", 3, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lpush_onto_empty_value() {
        let cache = MemoryCache::new();
        cache.store_without_ttl("list", b"").await.unwrap();
        cache.lpush("list", b"a").await.unwrap();
        assert_eq!(cache.lrange("list", 0, -1).await.unwrap(), strings(&["a"]));
    }

    #[tokio::test]
    async fn test_list_elements_are_lossy_utf8() {
        let cache = MemoryCache::new();
        cache.lpush("list", b"ok").await.unwrap();
        cache.lpush("list", &[0x66, 0xff, 0x6f]).await.unwrap();

        assert_eq!(
            cache.lrange("list", 0, -1).await.unwrap(),
            strings(&["f\u{FFFD}o", "ok"])
        );

        // Removal compares after the same conversion.
        cache.lrem("list", 0, &[0x66, 0xfe, 0x6f]).await.unwrap();
        assert_eq!(cache.lrange("list", 0, -1).await.unwrap(), strings(&["ok"]));
    }

    #[tokio::test]
    async fn test_lrem_variants() {
        for (count, expected) in [(1, vec!["b", "a"]), (-1, vec!["a", "b"]), (0, vec!["b"])] {
            let cache = MemoryCache::new();
            for item in ["a", "b", "a"].iter().rev() {
                cache.lpush("list", item.as_bytes()).await.unwrap();
            }
            assert_eq!(cache.lrange("list", 0, -1).await.unwrap(), strings(&["a", "b", "a"]));

            cache.lrem("list", count, b"a").await.unwrap();

            assert_eq!(
                cache.lrange("list", 0, -1).await.unwrap(),
                strings(&expected),
                "count = {}",
                count
            );
        }
    }

    #[tokio::test]
    async fn test_lrem_to_empty_deletes_key() {
        let cache = MemoryCache::new();
        cache.lpush("list", b"a").await.unwrap();
        cache.lpush("list", b"a").await.unwrap();

        cache.lrem("list", 0, b"a").await.unwrap();

        assert_eq!(cache.get("list").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_lrem_missing_key_is_noop() {
        let cache = MemoryCache::new();
        cache.lrem("missing", 1, b"a").await.unwrap();
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_ltrim_keeps_head() {
        let cache = MemoryCache::new();
        cache.lpush("list", b"a").await.unwrap();
        cache.lpush("list", b"b").await.unwrap();

        cache.ltrim("list", 0, 0).await.unwrap();

        assert_eq!(cache.lrange("list", 0, -1).await.unwrap(), strings(&["b"]));
    }

    #[tokio::test]
    async fn test_ltrim_to_empty_deletes_key() {
        let cache = MemoryCache::new();
        cache.lpush("list", b"a").await.unwrap();

        cache.ltrim("list", 5, 10).await.unwrap();

        assert_eq!(cache.get("list").await.unwrap(), None);
        assert!(cache.lrange("list", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_list_is_treated_as_absent() {
        let cache = MemoryCache::new();
        cache.store("list", b"x,y", Duration::from_millis(20)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.lrange("list", 0, -1).await.unwrap().is_empty());
        cache.lpush("list", b"a").await.unwrap();
        assert_eq!(cache.lrange("list", 0, -1).await.unwrap(), strings(&["a"]));
    }

    #[tokio::test]
    async fn test_keys_by_pattern() {
        let cache = MemoryCache::new();
        for key in ["test:1", "test:2", "other:1"] {
            cache.store_without_ttl(key, b"value").await.unwrap();
        }

        let keys = cache.keys_by_pattern("test:*").await.unwrap();
        assert_eq!(keys, strings(&["test:1", "test:2"]));

        let keys = cache.keys_by_pattern("?????:1").await.unwrap();
        assert_eq!(keys, strings(&["other:1"]));

        let keys = cache.keys_by_pattern("test:[2-9]").await.unwrap();
        assert_eq!(keys, strings(&["test:2"]));
    }

    #[tokio::test]
    async fn test_keys_by_pattern_wildcard_stops_at_separator() {
        let cache = MemoryCache::new();
        for key in ["test:a", "test:a/b", "test:x/y"] {
            cache.store_without_ttl(key, b"value").await.unwrap();
        }

        assert_eq!(cache.keys_by_pattern("test:*").await.unwrap(), strings(&["test:a"]));
        assert_eq!(
            cache.keys_by_pattern("test:*/*").await.unwrap(),
            strings(&["test:a/b", "test:x/y"])
        );
        assert_eq!(cache.keys_by_pattern("test:a?b").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_keys_by_pattern_skips_expired() {
        let cache = MemoryCache::new();
        cache.store("test:old", b"v", Duration::ZERO).await.unwrap();
        cache.store_without_ttl("test:new", b"v").await.unwrap();

        assert_eq!(cache.keys_by_pattern("test:*").await.unwrap(), strings(&["test:new"]));
    }

    #[tokio::test]
    async fn test_keys_by_invalid_pattern() {
        let cache = MemoryCache::new();

        let result = cache.keys_by_pattern("test:[").await;
        assert!(matches!(result, Err(CacheError::InvalidPattern(_))));

        // Rejected even when there is nothing to match against
        cache.store_without_ttl("test:1", b"v").await.unwrap();
        assert!(cache.keys_by_pattern("[").await.is_err());
    }

    #[tokio::test]
    async fn test_values_by_keys_keeps_order() {
        let cache = MemoryCache::new();
        cache.store_without_ttl("a", b"1").await.unwrap();
        cache.store_without_ttl("c", b"3").await.unwrap();

        let values = cache
            .values_by_keys(&strings(&["c", "b", "a"]))
            .await
            .unwrap();

        assert_eq!(values, vec![Some(b"3".to_vec()), None, Some(b"1".to_vec())]);
    }

    #[tokio::test]
    async fn test_close_clears_and_ping_succeeds() {
        let cache = MemoryCache::new();
        cache.store_without_ttl("k", b"v").await.unwrap();
        cache.ping().await.unwrap();

        cache.close().await.unwrap();

        assert!(cache.is_empty().await);
        cache.ping().await.unwrap();
    }
}
