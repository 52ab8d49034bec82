//! In-memory cache tier

use std::sync::Arc;

use dashmap::DashMap;
use image::DynamicImage;

/// Concurrent memory tier mapping storage keys to decoded images.
///
/// Backed by a sharded concurrent map, safe for read/insert/remove from
/// multiple threads without external locking. The optional `max_entries`
/// bound is advisory: when the map is full, inserting a new key evicts an
/// arbitrary resident entry to make room. Callers must never depend on a
/// memory hit.
pub(crate) struct MemoryStore {
    entries: DashMap<String, Arc<DynamicImage>>,
    max_entries: Option<usize>,
}

impl MemoryStore {
    pub fn new(initial_capacity: usize, concurrency: usize, max_entries: Option<usize>) -> Self {
        // The sharded map needs a power-of-two shard count of at least 2.
        let shards = concurrency.next_power_of_two().max(2);
        Self {
            entries: DashMap::with_capacity_and_shard_amount(initial_capacity, shards),
            max_entries,
        }
    }

    /// Insert `image` under `key` unless the key is already resident.
    ///
    /// Returns whether the value was inserted. Concurrent inserts of the
    /// same key keep exactly one value.
    pub fn insert_if_absent(&self, key: &str, image: Arc<DynamicImage>) -> bool {
        use dashmap::mapref::entry::Entry;

        if let Some(max) = self.max_entries {
            if self.entries.len() >= max && !self.entries.contains_key(key) {
                // Victim choice is arbitrary; the bound is advisory.
                let victim = self.entries.iter().next().map(|e| e.key().clone());
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(image);
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<DynamicImage>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
