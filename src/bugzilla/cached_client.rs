//! Cached Bugzilla client that wraps BugzillaClient with transparent caching.

use color_eyre::Result;
use url::Url;

use crate::cache::{CacheResult, QueryCache, QueryKey};
use crate::config::BugzillaConfig;

use super::cache::BugQuery;
use super::client::BugzillaClient;
use super::types::Bug;

/// Bugzilla client with a short-lived in-memory cache.
///
/// Identical searches within a minute share one request. A failed request is
/// returned as is, never papered over with older data.
#[derive(Clone)]
pub struct CachedBugzillaClient {
  inner: BugzillaClient,
  cache: QueryCache<Vec<Bug>>,
}

impl CachedBugzillaClient {
  pub fn new(config: &BugzillaConfig) -> Result<Self> {
    let inner = BugzillaClient::new(config)?;
    Ok(Self {
      inner,
      cache: QueryCache::new(),
    })
  }

  /// Search bugs, served from cache while the entry is valid.
  pub async fn search_bugs(&self, query: &BugQuery) -> Result<CacheResult<Vec<Bug>>> {
    self
      .cache
      .fetch(query, |encoded| {
        let inner = self.inner.clone();
        async move { inner.search_bugs(&encoded).await }
      })
      .await
  }

  /// Search bugs, skipping any valid cache entry.
  pub async fn refresh_bugs(&self, query: &BugQuery) -> Result<CacheResult<Vec<Bug>>> {
    self
      .cache
      .refresh(query, |encoded| {
        let inner = self.inner.clone();
        async move { inner.search_bugs(&encoded).await }
      })
      .await
  }

  /// Browser link for a search (not cached - pure URL building).
  pub fn buglist_url(&self, query: &BugQuery) -> Result<Url> {
    self.inner.buglist_url(&query.canonical())
  }

  pub fn base_url(&self) -> &Url {
    self.inner.base_url()
  }
}
