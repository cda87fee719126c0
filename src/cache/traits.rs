//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Trait for queries whose results can be cached.
///
/// Two logically equal queries must produce the same canonical string, regardless
/// of the order in which their filter values were added.
pub trait QueryKey {
  /// Canonical encoding of the query. This is also what gets sent to the source.
  fn canonical(&self) -> String;

  /// Human readable label for logs
  fn description(&self) -> String;

  /// Stable, fixed-length key for the cache map
  fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the entry backing this data stops being served
  pub valid_until: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from freshly fetched data.
  pub fn from_network(data: T, valid_until: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      valid_until,
    }
  }

  /// Create a new cache result from a valid cache entry.
  pub fn from_cache(data: T, valid_until: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      valid_until,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the issue tracker
  Network,
  /// Data from a cache entry that has not expired yet
  Cache,
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Raw(&'static str);

  impl QueryKey for Raw {
    fn canonical(&self) -> String {
      self.0.to_string()
    }

    fn description(&self) -> String {
      format!("raw {}", self.0)
    }
  }

  #[test]
  fn test_cache_hash_is_sha256_hex() {
    let hash = Raw("a=1").cache_hash();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(hash, Raw("a=1").cache_hash());
    assert_ne!(hash, Raw("a=2").cache_hash());
  }
}
