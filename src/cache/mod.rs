//! In-memory caches for thumbnails and metadata records.
//!
//! Both caches are LRU-bounded with lazy TTL expiry (see [`TtlLruCache`]).
//! Thumbnail keys are `<canonical-path>-<size>`; metadata keys are the bare
//! canonical path. [`AssetCache::invalidate`] drops every variant belonging
//! to one asset and must be called after any rename or delete.

mod lru_ttl;
mod thumbnail;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

pub use lru_ttl::{CacheConfig, CacheStats, TtlLruCache};
pub use thumbnail::{clamp_thumbnail_size, generate_thumbnail};

use crate::metadata::MetadataRecord;

/// Cache key for a thumbnail variant.
#[must_use]
pub fn thumbnail_key(canonical_path: &str, size: u32) -> String {
    format!("{canonical_path}-{size}")
}

/// Combined counters for both caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetCacheStats {
    pub thumbnails: CacheStats,
    pub metadata: CacheStats,
}

/// Thumbnail and metadata caches sharing one configuration.
pub struct AssetCache {
    thumbnails: TtlLruCache<Bytes>,
    metadata: TtlLruCache<MetadataRecord>,
}

impl AssetCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            thumbnails: TtlLruCache::new(config),
            metadata: TtlLruCache::new(config),
        }
    }

    pub fn thumbnail(&self, canonical_path: &str, size: u32) -> Option<Bytes> {
        self.thumbnails.get(&thumbnail_key(canonical_path, size))
    }

    pub fn put_thumbnail(&self, canonical_path: &str, size: u32, bytes: Bytes) {
        self.thumbnails.insert(thumbnail_key(canonical_path, size), bytes);
    }

    pub fn metadata(&self, canonical_path: &str) -> Option<MetadataRecord> {
        self.metadata.get(canonical_path)
    }

    pub fn put_metadata(&self, record: MetadataRecord) {
        self.metadata.insert(record.relative_path.clone(), record);
    }

    /// Drops every cached thumbnail size and the metadata entry for an asset.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, canonical_path: &str) -> usize {
        let thumbs = self
            .thumbnails
            .invalidate_prefix(&format!("{canonical_path}-"));
        let meta = usize::from(self.metadata.remove(canonical_path));

        if thumbs + meta > 0 {
            debug!(path = %canonical_path, thumbnails = thumbs, metadata = meta, "Invalidated cache entries");
        }
        thumbs + meta
    }

    pub fn clear(&self) {
        self.thumbnails.clear();
        self.metadata.clear();
    }

    pub fn stats(&self) -> AssetCacheStats {
        AssetCacheStats {
            thumbnails: self.thumbnails.stats(),
            metadata: self.metadata.stats(),
        }
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
