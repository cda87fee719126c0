//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use super::traits::{CacheResult, QueryKey};

/// A cached search result. Replaced wholesale on refresh, never merged.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
  data: T,
  valid_until: DateTime<Utc>,
}

/// In-memory TTL cache keyed by [`QueryKey`].
///
/// Lookups take the shared lock, installing a fresh entry takes the exclusive lock,
/// and the fetch itself runs with no lock held so a slow query never blocks
/// unrelated ones.
///
/// Concurrent refreshes of the same expired key are not coalesced: each caller
/// fetches independently and the last completed write wins. The map itself is
/// always consistent.
pub struct QueryCache<T> {
  entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
  /// How long a fetched result is served without asking the source again
  ttl: Duration,
}

impl<T: Clone> QueryCache<T> {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(RwLock::new(HashMap::new())),
      ttl: Duration::minutes(1),
    }
  }

  /// Set how long entries stay valid.
  #[allow(dead_code)]
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. If an entry exists and `now <= valid_until`, return it with no fetch
  /// 2. Otherwise call the fetcher with the canonical query string
  /// 3. On success, install a new entry valid for the TTL and return the data
  /// 4. On failure, return the error; the existing entry (if any) is left as is
  pub async fn fetch<K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>>
  where
    K: QueryKey + ?Sized,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(entry) = self.lookup(&key.cache_hash())? {
      if Utc::now() <= entry.valid_until {
        debug!(query = %key.description(), "cache hit");
        return Ok(CacheResult::from_cache(entry.data, entry.valid_until));
      }
    }

    self.refresh(key, fetcher).await
  }

  /// Unconditionally fetch from the source and install the result.
  ///
  /// A failed refresh does not evict or touch the current entry.
  pub async fn refresh<K, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>>
  where
    K: QueryKey + ?Sized,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let query = key.canonical();
    info!(query = %key.description(), "refresh: {}", query);

    let data = match fetcher(query).await {
      Ok(data) => data,
      Err(e) => {
        warn!(query = %key.description(), "refresh failed: {}", e);
        return Err(e);
      }
    };

    let valid_until = Utc::now() + self.ttl;
    self.install(key.cache_hash(), data.clone(), valid_until)?;

    Ok(CacheResult::from_network(data, valid_until))
  }

  fn lookup(&self, hash: &str) -> Result<Option<CacheEntry<T>>> {
    let entries = self
      .entries
      .read()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(hash).cloned())
  }

  fn install(&self, hash: String, data: T, valid_until: DateTime<Utc>) -> Result<()> {
    let mut entries = self
      .entries
      .write()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(hash, CacheEntry { data, valid_until });
    Ok(())
  }
}

impl<T: Clone> Default for QueryCache<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      ttl: self.ttl,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct Key(&'static str);

  impl QueryKey for Key {
    fn canonical(&self) -> String {
      self.0.to_string()
    }

    fn description(&self) -> String {
      self.0.to_string()
    }
  }

  impl<T> QueryCache<T> {
    /// Number of entries held, expired ones included
    fn len(&self) -> usize {
      self.entries.read().expect("lock poisoned").len()
    }

    fn is_empty(&self) -> bool {
      self.len() == 0
    }
  }

  fn counting_fetcher(
    calls: &Arc<AtomicU32>,
    value: Vec<u32>,
  ) -> impl FnOnce(String) -> std::future::Ready<Result<Vec<u32>>> {
    let calls = calls.clone();
    move |_query| {
      calls.fetch_add(1, Ordering::SeqCst);
      std::future::ready(Ok(value))
    }
  }

  fn failing_fetcher(
    calls: &Arc<AtomicU32>,
  ) -> impl FnOnce(String) -> std::future::Ready<Result<Vec<u32>>> {
    let calls = calls.clone();
    move |_query| {
      calls.fetch_add(1, Ordering::SeqCst);
      std::future::ready(Err(eyre!("bugzilla is down")))
    }
  }

  #[tokio::test]
  async fn test_second_fetch_within_ttl_is_a_hit() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let first = cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![1, 2]))
      .await
      .unwrap();
    let second = cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![9]))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, first.data);
    assert_eq!(second.valid_until, first.valid_until);
  }

  #[tokio::test]
  async fn test_fetcher_receives_canonical_query() {
    let cache: QueryCache<String> = QueryCache::new();
    let result = cache
      .fetch(&Key("component=a&product=b"), |query| async move {
        Ok(query)
      })
      .await
      .unwrap();
    assert_eq!(result.data, "component=a&product=b");
  }

  #[tokio::test]
  async fn test_expired_entry_triggers_fetch() {
    let cache = QueryCache::new().with_ttl(Duration::milliseconds(20));
    let calls = Arc::new(AtomicU32::new(0));

    cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![1]))
      .await
      .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let result = cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![2]))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data, vec![2]);
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn test_distinct_keys_have_distinct_entries() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    cache
      .fetch(&Key("a"), counting_fetcher(&calls, vec![1]))
      .await
      .unwrap();
    let b = cache
      .fetch(&Key("b"), counting_fetcher(&calls, vec![2]))
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(b.data, vec![2]);
    assert_eq!(cache.len(), 2);
  }

  #[tokio::test]
  async fn test_failure_without_entry_is_passed_through() {
    let cache: QueryCache<Vec<u32>> = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    let err = cache
      .fetch(&Key("q"), failing_fetcher(&calls))
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "bugzilla is down");
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_valid_entry() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![7]))
      .await
      .unwrap();
    assert!(cache
      .refresh(&Key("q"), failing_fetcher(&calls))
      .await
      .is_err());

    let result = cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![8]))
      .await
      .unwrap();

    // initial fetch + failed refresh, no third call
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.source, CacheSource::Cache);
    assert_eq!(result.data, vec![7]);
  }

  #[tokio::test]
  async fn test_failed_refresh_of_expired_entry_is_not_served_stale() {
    let cache = QueryCache::new().with_ttl(Duration::milliseconds(20));
    let calls = Arc::new(AtomicU32::new(0));

    cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![1]))
      .await
      .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(cache
      .fetch(&Key("q"), failing_fetcher(&calls))
      .await
      .is_err());
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn test_refresh_replaces_entry_wholesale() {
    let cache = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));

    cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![1, 2, 3]))
      .await
      .unwrap();
    cache
      .refresh(&Key("q"), counting_fetcher(&calls, vec![4]))
      .await
      .unwrap();
    let result = cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![5]))
      .await
      .unwrap();

    assert_eq!(result.data, vec![4]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_fetches_keep_map_consistent() {
    let cache: QueryCache<Vec<u32>> = QueryCache::new();
    let calls = Arc::new(AtomicU32::new(0));
    let keys = ["a", "b", "c", "d"];

    let handles: Vec<_> = (0..32u32)
      .map(|i| {
        let cache = cache.clone();
        let calls = calls.clone();
        let key = Key(keys[(i % 4) as usize]);
        tokio::spawn(async move {
          cache
            .fetch(&key, move |_query| async move {
              calls.fetch_add(1, Ordering::SeqCst);
              tokio::time::sleep(std::time::Duration::from_millis(5)).await;
              Ok(vec![i % 4])
            })
            .await
        })
      })
      .collect();

    for handle in futures::future::join_all(handles).await {
      let result = handle.unwrap().unwrap();
      assert_eq!(result.data.len(), 1);
    }

    // Refreshes of one key may race, so only bounds are guaranteed.
    let total = calls.load(Ordering::SeqCst);
    assert!((4..=32).contains(&total));
    assert_eq!(cache.len(), 4);

    for (i, key) in keys.iter().enumerate() {
      let hit = cache
        .fetch(&Key(key), |_query| async { Err(eyre!("should not be called")) })
        .await
        .unwrap();
      assert_eq!(hit.data, vec![i as u32]);
    }
  }

  #[tokio::test]
  async fn test_poisoned_lock_is_reported_as_error() {
    let cache: QueryCache<Vec<u32>> = QueryCache::new();
    let entries = Arc::clone(&cache.entries);
    let _ = std::thread::spawn(move || {
      let _guard = entries.write().unwrap();
      panic!("poison the cache lock");
    })
    .join();

    let calls = Arc::new(AtomicU32::new(0));
    let err = cache
      .fetch(&Key("q"), counting_fetcher(&calls, vec![1]))
      .await
      .unwrap_err();

    assert!(err.to_string().starts_with("Lock poisoned"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }
}
