//! Flat-file caching for fetched datasets.
//!
//! This module provides a small cache keyed by file path:
//! - Each entry is one JSON file; its modification time is its timestamp
//! - Entries older than the configured TTL read as absent
//! - Unreadable or corrupt entries also read as absent, never as errors

mod disk;
mod layer;
mod traits;

pub use disk::DiskCache;
pub use layer::CacheLayer;
pub use traits::CacheSource;
