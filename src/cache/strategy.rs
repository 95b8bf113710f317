//! Eviction strategies for the cache fabric (§4.2).

use std::collections::HashMap;

use chrono::Utc;

use super::fabric::CacheEntry;

/// Picks the key to evict when the fabric is over `maxSize`/`memoryLimit`.
/// Implementors must be deterministic given the same entry snapshot so
/// eviction under contention is reproducible in tests.
pub trait EvictionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn pick_victim(&self, entries: &HashMap<String, CacheEntry>) -> Option<String>;
}

/// Evicts the least-recently-read entry; ties broken by insertion order.
pub struct Lru;

impl EvictionStrategy for Lru {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn pick_victim(&self, entries: &HashMap<String, CacheEntry>) -> Option<String> {
        entries
            .iter()
            .min_by_key(|(_, e)| (e.last_accessed_at, e.insertion_seq))
            .map(|(k, _)| k.clone())
    }
}

/// Evicts the least-frequently-read entry; ties broken by insertion order.
pub struct Lfu;

impl EvictionStrategy for Lfu {
    fn name(&self) -> &'static str {
        "lfu"
    }

    fn pick_victim(&self, entries: &HashMap<String, CacheEntry>) -> Option<String> {
        entries
            .iter()
            .min_by_key(|(_, e)| (e.hits, e.insertion_seq))
            .map(|(k, _)| k.clone())
    }
}

/// Weighted sum of recency and frequency; ties broken by insertion order.
/// Higher `recency_weight` favors LRU-like behavior, higher
/// `frequency_weight` favors LFU-like behavior.
pub struct Hybrid {
    pub recency_weight: f64,
    pub frequency_weight: f64,
}

impl Default for Hybrid {
    fn default() -> Self {
        Self {
            recency_weight: 0.5,
            frequency_weight: 0.5,
        }
    }
}

impl Hybrid {
    /// Higher score = more evictable. Recency component grows with seconds
    /// since last access; frequency component shrinks with hit count.
    fn evictability_score(&self, entry: &CacheEntry) -> f64 {
        let seconds_idle = (Utc::now() - entry.last_accessed_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;
        let frequency_component = 1.0 / (entry.hits as f64 + 1.0);
        self.recency_weight * seconds_idle + self.frequency_weight * frequency_component
    }
}

impl EvictionStrategy for Hybrid {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn pick_victim(&self, entries: &HashMap<String, CacheEntry>) -> Option<String> {
        entries
            .iter()
            .max_by(|(_, a), (_, b)| {
                self.evictability_score(a)
                    .partial_cmp(&self.evictability_score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.insertion_seq.cmp(&b.insertion_seq))
            })
            .map(|(k, _)| k.clone())
    }
}
