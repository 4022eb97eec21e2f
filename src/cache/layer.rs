//! Cache layer that orchestrates caching logic with network fetching.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::warn;

use super::disk::DiskCache;
use super::traits::CacheResult;

/// Sits between the fetcher and the network, serving fresh entries from disk.
///
/// With no `DiskCache` configured every call goes to the network and nothing
/// is written.
#[derive(Debug, Clone, Default)]
pub struct CacheLayer {
  disk: Option<DiskCache>,
}

impl CacheLayer {
  pub fn new(disk: DiskCache) -> Self {
    Self { disk: Some(disk) }
  }

  /// A layer that always fetches.
  pub fn disabled() -> Self {
    Self { disk: None }
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. If caching is on and `use_cache` is set, return a fresh entry immediately
  /// 2. Otherwise fetch from network
  /// 3. Refresh the entry when caching is on (a failed write is only logged)
  pub async fn fetch<T, F, Fut>(&self, key: &str, use_cache: bool, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(disk) = &self.disk {
      if use_cache {
        if let Some(entry) = disk.load::<T>(key) {
          return Ok(CacheResult::from_cache(entry));
        }
      }
    }

    let data = fetcher().await?;

    if let Some(disk) = &self.disk {
      if let Err(e) = disk.save(key, &data) {
        warn!("Failed to refresh cache entry {}: {}", key, e);
      }
    }

    Ok(CacheResult::from_network(data))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use color_eyre::eyre::eyre;
  use std::cell::Cell;
  use std::time::Duration;

  fn layer(dir: &std::path::Path) -> CacheLayer {
    CacheLayer::new(DiskCache::new(dir, Duration::from_secs(3600)))
  }

  #[tokio::test]
  async fn test_miss_fetches_and_stores() {
    let dir = tempfile::tempdir().unwrap();
    let cache = layer(dir.path());

    let result = cache
      .fetch("boards", true, || async { Ok(vec![1, 2, 3]) })
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert!(dir.path().join("boards.json").exists());
  }

  #[tokio::test]
  async fn test_hit_skips_fetcher() {
    let dir = tempfile::tempdir().unwrap();
    let cache = layer(dir.path());
    cache
      .fetch("boards", true, || async { Ok(vec![1, 2, 3]) })
      .await
      .unwrap();

    let called = Cell::new(false);
    let result = cache
      .fetch("boards", true, || {
        called.set(true);
        async { Ok(vec![9]) }
      })
      .await
      .unwrap();

    assert!(!called.get());
    assert_eq!(result.source, CacheSource::CacheFresh);
    assert!(result.cached_at.is_some());
    assert_eq!(result.data, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_bypass_refetches_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let cache = layer(dir.path());
    cache
      .fetch("boards", true, || async { Ok(vec![1]) })
      .await
      .unwrap();

    let result = cache
      .fetch("boards", false, || async { Ok(vec![2]) })
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);

    let again = cache
      .fetch("boards", true, || async { Ok(vec![3]) })
      .await
      .unwrap();
    assert_eq!(again.data, vec![2]);
  }

  #[tokio::test]
  async fn test_disabled_never_touches_disk() {
    let cache = CacheLayer::disabled();
    let calls = Cell::new(0);
    for _ in 0..2 {
      let result = cache
        .fetch("boards", true, || {
          calls.set(calls.get() + 1);
          async { Ok(vec![1]) }
        })
        .await
        .unwrap();
      assert_eq!(result.source, CacheSource::Network);
    }
    assert_eq!(calls.get(), 2);
  }

  #[tokio::test]
  async fn test_fetch_error_propagates_and_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache = layer(dir.path());
    let result = cache
      .fetch::<Vec<i32>, _, _>("boards", true, || async { Err(eyre!("upstream down")) })
      .await;
    assert!(result.is_err());
    assert!(!dir.path().join("boards.json").exists());
  }
}
