//! In-process result cache.
//!
//! Entries expire by wall-clock TTL per entity class and are replaced only
//! when the incoming data version is at least as fresh as the stored one,
//! so a slow assessment finishing late cannot clobber a fresher result.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use crate::config::CacheConfig;
use crate::port::{CacheKey, Cached, EntityKind, ResultCache};

struct Slot {
    cached: Cached,
    expires_at: Instant,
}

pub struct MemoryCache {
    inner: DashMap<CacheKey, Slot>,
    config: CacheConfig,
}

impl MemoryCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: DashMap::new(),
            config,
        }
    }

    fn ttl_for(&self, kind: EntityKind) -> Duration {
        let secs = match kind {
            EntityKind::CompositeScore => self.config.composite_ttl_secs,
            EntityKind::DetectorResult => self.config.detector_ttl_secs,
            EntityKind::HistoricalAggregate => self.config.aggregate_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Cached> {
        let expired = match self.inner.get(key) {
            Some(slot) if Instant::now() < slot.expires_at => {
                return Some(slot.cached.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            // The read guard is dropped; evict lazily.
            self.inner.remove(key);
            trace!(entity_id = %key.entity_id, "evicted expired cache entry");
        }
        None
    }

    fn put(&self, key: CacheKey, entry: Cached) {
        let ttl = self.ttl_for(key.kind);
        if ttl.is_zero() {
            return;
        }
        let slot = Slot {
            cached: entry,
            expires_at: Instant::now() + ttl,
        };
        match self.inner.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
            }
            Entry::Occupied(mut occupied) => {
                // Last writer wins by data version, not by completion time.
                if slot.cached.data_version >= occupied.get().cached.data_version {
                    occupied.insert(slot);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataVersion;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn version(bids: u32) -> DataVersion {
        DataVersion {
            last_change: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            status_rank: 3,
            bid_count: bids,
        }
    }

    fn key(id: &str) -> CacheKey {
        CacheKey::new(EntityKind::CompositeScore, id, "1.0.0")
    }

    #[test]
    fn round_trips_within_ttl() {
        let cache = MemoryCache::new(CacheConfig::default());
        cache.put(
            key("t-1"),
            Cached {
                value: json!({"score": 40.0}),
                data_version: version(2),
            },
        );
        let hit = cache.get(&key("t-1")).unwrap();
        assert_eq!(hit.value, json!({"score": 40.0}));
        assert!(cache.get(&key("t-2")).is_none());
    }

    #[test]
    fn stale_data_version_cannot_overwrite() {
        let cache = MemoryCache::new(CacheConfig::default());
        cache.put(
            key("t-1"),
            Cached {
                value: json!("fresh"),
                data_version: version(3),
            },
        );
        cache.put(
            key("t-1"),
            Cached {
                value: json!("stale"),
                data_version: version(2),
            },
        );
        assert_eq!(cache.get(&key("t-1")).unwrap().value, json!("fresh"));
    }

    #[test]
    fn zero_ttl_disables_storage() {
        let cache = MemoryCache::new(CacheConfig {
            composite_ttl_secs: 0,
            ..CacheConfig::default()
        });
        cache.put(
            key("t-1"),
            Cached {
                value: json!(1),
                data_version: version(1),
            },
        );
        assert!(cache.get(&key("t-1")).is_none());
        assert!(cache.is_empty());
    }
}
