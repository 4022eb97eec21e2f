//! JSON file storage with modification-time expiry.

use chrono::{DateTime, Local};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use super::traits::CachedEntry;

/// Read the entry at `path` if it exists and is younger than `ttl`.
///
/// Missing, expired, unreadable and undecodable files all yield `None`.
pub fn load<T: DeserializeOwned>(path: &Path, ttl: Duration) -> Option<CachedEntry<T>> {
  let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
    Ok(modified) => modified,
    Err(_) => {
      debug!("Cache miss (absent): {}", path.display());
      return None;
    }
  };

  // A timestamp in the future counts as age zero
  let age = SystemTime::now()
    .duration_since(modified)
    .unwrap_or(Duration::ZERO);
  if age > ttl {
    debug!(
      "Cache miss (expired {}s > {}s): {}",
      age.as_secs(),
      ttl.as_secs(),
      path.display()
    );
    return None;
  }

  let bytes = match std::fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) => {
      warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
      return None;
    }
  };

  match serde_json::from_slice(&bytes) {
    Ok(data) => Some(CachedEntry {
      data,
      cached_at: DateTime::<Local>::from(modified),
    }),
    Err(e) => {
      warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
      None
    }
  }
}

/// Write `value` to `path`, creating parent directories and replacing any
/// previous entry.
pub fn save<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", parent.display(), e))?;
  }

  let data = serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize cache entry: {}", e))?;
  std::fs::write(path, data)
    .map_err(|e| eyre!("Failed to write cache file {}: {}", path.display(), e))?;

  Ok(())
}

/// A cache directory with a single TTL; keys map to `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct DiskCache {
  dir: PathBuf,
  ttl: Duration,
}

impl DiskCache {
  pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
    Self {
      dir: dir.into(),
      ttl,
    }
  }

  pub fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }

  pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<CachedEntry<T>> {
    load(&self.path_for(key), self.ttl)
  }

  pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<PathBuf> {
    let path = self.path_for(key);
    save(&path, value)?;
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  const HOUR: Duration = Duration::from_secs(60 * 60);

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Row {
    code: String,
    price: Option<f64>,
    count: Option<u64>,
  }

  fn rows() -> Vec<Row> {
    vec![
      Row {
        code: "BK0001".to_string(),
        price: Some(1234.5678901234),
        count: Some(42),
      },
      Row {
        code: "BK0002".to_string(),
        price: None,
        count: None,
      },
      Row {
        code: "BK0003".to_string(),
        price: Some(0.1 + 0.2),
        count: Some(0),
      },
    ]
  }

  fn backdate(path: &Path, by: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
  }

  #[test]
  fn test_load_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let loaded: Option<CachedEntry<Vec<Row>>> = load(&dir.path().join("none.json"), HOUR);
    assert!(loaded.is_none());
  }

  #[test]
  fn test_save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("rows.json");

    save(&path, &rows()).unwrap();
    let loaded: CachedEntry<Vec<Row>> = load(&path, HOUR).unwrap();
    assert_eq!(loaded.data, rows());
  }

  #[test]
  fn test_stale_entry_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.json");
    save(&path, &rows()).unwrap();

    assert!(load::<Vec<Row>>(&path, HOUR).is_some());

    backdate(&path, 2 * HOUR);
    assert!(load::<Vec<Row>>(&path, HOUR).is_none());
    // Still readable with a longer TTL
    assert!(load::<Vec<Row>>(&path, 3 * HOUR).is_some());
  }

  #[test]
  fn test_corrupt_entry_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.json");
    std::fs::write(&path, b"{ not json").unwrap();
    assert!(load::<Vec<Row>>(&path, HOUR).is_none());
  }

  #[test]
  fn test_wrong_shape_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.json");
    save(&path, &vec![1, 2, 3]).unwrap();
    assert!(load::<Vec<Row>>(&path, HOUR).is_none());
  }

  #[test]
  fn test_save_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::new(dir.path(), HOUR);

    cache.save("rows", &rows()).unwrap();
    let fewer = rows()[..1].to_vec();
    cache.save("rows", &fewer).unwrap();

    let loaded: CachedEntry<Vec<Row>> = cache.load("rows").unwrap();
    assert_eq!(loaded.data, fewer);
  }

  #[test]
  fn test_key_maps_to_json_file() {
    let cache = DiskCache::new("/tmp/cache", HOUR);
    assert_eq!(
      cache.path_for("all_concepts"),
      PathBuf::from("/tmp/cache/all_concepts.json")
    );
  }
}
