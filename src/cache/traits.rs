//! Core types for the caching system.

use chrono::{DateTime, Local};

/// A value read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
  pub data: T,
  /// File modification time of the entry
  pub cached_at: DateTime<Local>,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Local>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a fresh cache entry.
  pub fn from_cache(entry: CachedEntry<T>) -> Self {
    Self {
      data: entry.data,
      source: CacheSource::CacheFresh,
      cached_at: Some(entry.cached_at),
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, within its TTL
  CacheFresh,
}
