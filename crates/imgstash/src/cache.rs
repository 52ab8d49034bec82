//! Two-tier cache facade

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::disk::DiskStore;
use crate::error::Result;
use crate::key::StorageKey;
use crate::memory::MemoryStore;
use crate::metrics::{CacheMetrics, CacheStats};

/// PNG compression effort for the disk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    /// Minimal effort, largest files.
    Fast,
    /// The encoder's default effort.
    Balanced,
    /// Maximum effort, smallest files.
    Best,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Initial capacity of the memory tier.
    pub initial_capacity: usize,
    /// Expected number of simultaneous writers; rounded up to a power of
    /// two for the sharded memory map.
    pub concurrency: usize,
    /// Advisory upper bound on memory-tier entries, `None` for unbounded.
    ///
    /// When the bound is reached, inserting a new key evicts an arbitrary
    /// resident entry. Eviction is advisory: callers must never depend on a
    /// memory hit.
    pub max_entries: Option<usize>,
    /// PNG compression effort for entries persisted to disk.
    pub compression: PngCompression,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 40,
            concurrency: 4,
            max_entries: None,
            compression: PngCompression::Balanced,
        }
    }
}

/// Two-tier (memory + disk) image cache with a sanitized key space.
///
/// Lookups check a concurrent in-memory map first, then a flat directory of
/// PNG files, promoting disk hits back into memory. The cache is best-effort
/// by contract: every disk or codec failure degrades to a logged miss or
/// no-op, so a miss is always a valid outcome and callers can continue
/// without the cache.
///
/// The cache assumes exclusive ownership of the regular files in its
/// directory; [`TieredCache::clear`] deletes them all. `TieredCache` is
/// `Send + Sync` — share one handle between workers (e.g. in an `Arc`)
/// instead of keeping global state.
pub struct TieredCache {
    memory: MemoryStore,
    disk: DiskStore,
    metrics: CacheMetrics,
}

impl TieredCache {
    /// Open a cache over `dir` with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(dir, CacheConfig::default())
    }

    /// Open a cache over `dir` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn with_config(dir: impl AsRef<Path>, config: CacheConfig) -> Result<Self> {
        let disk = DiskStore::new(dir.as_ref(), config.compression)?;
        let memory = MemoryStore::new(
            config.initial_capacity,
            config.concurrency,
            config.max_entries,
        );
        debug!("opened image cache at: {}", dir.as_ref().display());

        Ok(Self {
            memory,
            disk,
            metrics: CacheMetrics::default(),
        })
    }

    /// The directory backing the disk tier.
    pub fn cache_dir(&self) -> &Path {
        self.disk.dir()
    }

    /// Whether `key` is resident in either tier.
    pub fn contains(&self, key: &str) -> bool {
        self.contains_in_memory(key) || self.contains_on_disk(key)
    }

    /// Whether `key` is resident in the memory tier.
    pub fn contains_in_memory(&self, key: &str) -> bool {
        self.memory.contains(StorageKey::new(key).as_str())
    }

    /// Whether a file for `key` exists in the cache directory.
    ///
    /// I/O failures are logged and count as "not present".
    pub fn contains_on_disk(&self, key: &str) -> bool {
        let storage_key = StorageKey::new(key);
        match self.disk.contains(storage_key.as_str()) {
            Ok(present) => present,
            Err(e) => {
                warn!("disk lookup failed for {}: {}", storage_key, e);
                false
            }
        }
    }

    /// Insert `image` under `key` into both tiers, overwriting neither.
    ///
    /// The memory insert happens only if the key is absent there; the disk
    /// write happens only if no file for the key exists. Returns `true` if
    /// either actually happened, `false` when the key was already fully
    /// cached or errors prevented both. Disk failures are logged, never
    /// raised.
    pub fn put(&self, key: &str, image: DynamicImage) -> bool {
        let storage_key = StorageKey::new(key);
        let image = Arc::new(image);

        let inserted = self
            .memory
            .insert_if_absent(storage_key.as_str(), Arc::clone(&image));

        let written = match self.disk.write_if_absent(storage_key.as_str(), &image) {
            Ok(written) => {
                if written {
                    self.metrics.record_disk_write();
                }
                written
            }
            Err(e) => {
                warn!("failed to persist {}: {}", storage_key, e);
                false
            }
        };

        inserted || written
    }

    /// Look up `key`, promoting a disk hit into the memory tier.
    ///
    /// Returns `None` on a miss — including any I/O or decode failure, which
    /// is logged and degraded. A file that fails to decode is left in place.
    pub fn get(&self, key: &str) -> Option<Arc<DynamicImage>> {
        let storage_key = StorageKey::new(key);

        if let Some(image) = self.memory.get(storage_key.as_str()) {
            self.metrics.record_hit();
            return Some(image);
        }

        match self.disk.read(storage_key.as_str()) {
            Ok(Some(image)) => {
                let image = Arc::new(image);
                // Promote under the storage key so later memory lookups,
                // which also search by storage key, can find it.
                self.memory
                    .insert_if_absent(storage_key.as_str(), Arc::clone(&image));
                self.metrics.record_hit();
                self.metrics.record_promotion();
                Some(image)
            }
            Ok(None) => {
                self.metrics.record_miss();
                None
            }
            Err(e) => {
                warn!("failed to load {} from disk: {}", storage_key, e);
                self.metrics.record_miss();
                None
            }
        }
    }

    /// Remove `key` from both tiers.
    ///
    /// Returns whether a memory entry or a disk file was actually removed.
    /// Deletion failures are logged and reported as `false`, never raised.
    pub fn remove(&self, key: &str) -> bool {
        let storage_key = StorageKey::new(key);

        let memory_removed = self.memory.remove(storage_key.as_str());

        let disk_removed = match self.disk.remove(storage_key.as_str()) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("failed to delete {} from disk: {}", storage_key, e);
                false
            }
        };

        let removed = memory_removed || disk_removed;
        if removed {
            self.metrics.record_removal();
        }
        removed
    }

    /// Empty both tiers.
    pub fn clear(&self) {
        self.clear_memory();
        self.clear_disk();
    }

    /// Empty the memory tier.
    pub fn clear_memory(&self) {
        self.memory.clear();
        debug!("cleared memory tier");
    }

    /// Delete every regular file in the cache directory.
    ///
    /// Non-recursive. Listing and per-file failures are logged and do not
    /// abort the remaining deletions.
    pub fn clear_disk(&self) {
        if let Err(e) = self.disk.clear() {
            warn!("failed to clear disk cache: {}", e);
        }
    }

    /// Number of entries resident in the memory tier.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }
}
