use crate::error::{LineageError, Result};
use crate::store::VesselStore;
use fct_model::Batch;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Decides whether a cached batch may still be served.
pub trait InvalidationPolicy: Send + Sync {
    fn is_fresh(&self, loaded_at: Instant, now: Instant) -> bool;
}

/// Entries expire a fixed time after they were loaded.
#[derive(Debug, Clone, Copy)]
pub struct TtlInvalidation {
    ttl: Duration,
}

impl TtlInvalidation {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl InvalidationPolicy for TtlInvalidation {
    fn is_fresh(&self, loaded_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(loaded_at) < self.ttl
    }
}

/// Entries live until evicted or invalidated explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInvalidate;

impl InvalidationPolicy for NeverInvalidate {
    fn is_fresh(&self, _loaded_at: Instant, _now: Instant) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

struct CachedBatch {
    batch: Batch,
    loaded_at: Instant,
}

/// Read-through cache of batches by name, in front of a [`VesselStore`].
///
/// Misses are not cached: a batch created after a failed lookup is found on
/// the next call.
pub struct BatchCache {
    entries: LruCache<String, CachedBatch>,
    policy: Box<dyn InvalidationPolicy>,
    stats: CacheStats,
}

impl BatchCache {
    pub fn new(capacity: usize, policy: Box<dyn InvalidationPolicy>) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(LineageError::ZeroCapacity)?;
        Ok(Self {
            entries: LruCache::new(capacity),
            policy,
            stats: CacheStats::default(),
        })
    }

    pub fn with_ttl(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::new(capacity, Box::new(TtlInvalidation::new(ttl)))
    }

    pub fn get(&mut self, name: &str, store: &dyn VesselStore) -> Result<Option<Batch>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(name) {
            if self.policy.is_fresh(entry.loaded_at, now) {
                self.stats.hits += 1;
                return Ok(Some(entry.batch.clone()));
            }
            self.stats.expired += 1;
            self.entries.pop(name);
        }

        self.stats.misses += 1;
        let loaded = store.find_batch(name)?;
        if let Some(batch) = &loaded {
            log::debug!("Cached batch {}", batch.name);
            self.entries.put(
                name.to_string(),
                CachedBatch {
                    batch: batch.clone(),
                    loaded_at: now,
                },
            );
        }
        Ok(loaded)
    }

    pub fn invalidate(&mut self, name: &str) {
        self.entries.pop(name);
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLabStore;
    use pretty_assertions::assert_eq;

    fn store_with(names: &[&str]) -> InMemoryLabStore {
        let mut store = InMemoryLabStore::new();
        for name in names {
            store.insert_batch(Batch::new(*name, format!("https://tickets/{name}")));
        }
        store
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let store = store_with(&["LCSET-1"]);
        let mut cache = BatchCache::new(4, Box::new(NeverInvalidate)).unwrap();

        assert!(cache.get("LCSET-1", &store).unwrap().is_some());
        assert!(cache.get("LCSET-1", &store).unwrap().is_some());
        assert!(cache.get("LCSET-2", &store).unwrap().is_none());

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                expired: 0
            }
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_always_reloads() {
        let store = store_with(&["LCSET-1"]);
        let mut cache = BatchCache::with_ttl(4, Duration::ZERO).unwrap();

        cache.get("LCSET-1", &store).unwrap();
        cache.get("LCSET-1", &store).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let store = store_with(&["A", "B", "C"]);
        let mut cache = BatchCache::new(2, Box::new(NeverInvalidate)).unwrap();

        cache.get("A", &store).unwrap();
        cache.get("B", &store).unwrap();
        cache.get("A", &store).unwrap();
        cache.get("C", &store).unwrap();
        cache.get("A", &store).unwrap();

        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidation_forces_reload() {
        let mut store = store_with(&["LCSET-1"]);
        let mut cache = BatchCache::new(4, Box::new(NeverInvalidate)).unwrap();
        cache.get("LCSET-1", &store).unwrap();

        store.insert_batch(Batch::new("LCSET-1", "https://moved/LCSET-1"));
        cache.invalidate("LCSET-1");

        let batch = cache.get("LCSET-1", &store).unwrap().unwrap();
        assert_eq!(batch.ticket_url, "https://moved/LCSET-1");

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            BatchCache::new(0, Box::new(NeverInvalidate)),
            Err(LineageError::ZeroCapacity)
        ));
    }
}
