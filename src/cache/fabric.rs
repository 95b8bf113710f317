//! The cache fabric itself (§4.2): a bounded, TTL-aware key/value store with
//! pluggable eviction, used by the Pairing Engine and Weather Fetcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::strategy::{EvictionStrategy, Hybrid, Lfu, Lru};
use crate::config::CacheStrategyName;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hits: u64,
    pub last_accessed_at: DateTime<Utc>,
    pub insertion_seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub entries: usize,
    pub total_size_bytes: usize,
    pub average_size_bytes: f64,
    pub uptime_secs: i64,
    pub strategy: String,
}

struct Stats {
    hits: u64,
    misses: u64,
    started_at: DateTime<Utc>,
}

/// A warmup/export record: `{k, v, ttl}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub ttl_secs: Option<i64>,
}

pub struct CacheFabric {
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: RwLock<Stats>,
    strategy: Box<dyn EvictionStrategy>,
    max_size: usize,
    memory_limit_bytes: u64,
    default_ttl: Duration,
    insertion_counter: AtomicU64,
}

impl CacheFabric {
    pub fn new(
        strategy_name: CacheStrategyName,
        max_size: usize,
        memory_limit_bytes: u64,
        default_ttl: StdDuration,
    ) -> Self {
        let strategy: Box<dyn EvictionStrategy> = match strategy_name {
            CacheStrategyName::Lru => Box::new(Lru),
            CacheStrategyName::Lfu => Box::new(Lfu),
            CacheStrategyName::Hybrid => Box::new(Hybrid::default()),
        };
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(Stats {
                hits: 0,
                misses: 0,
                started_at: Utc::now(),
            }),
            strategy,
            max_size,
            memory_limit_bytes,
            default_ttl: Duration::from_std(default_ttl).unwrap_or(Duration::hours(24)),
            insertion_counter: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.hits += 1;
                entry.last_accessed_at = now;
                let value = entry.value.clone();
                drop(entries);
                self.stats.write().hits += 1;
                metrics::counter!("cache_hits_total").increment(1);
                Some(value)
            }
            Some(_) => {
                entries.remove(key);
                drop(entries);
                self.stats.write().misses += 1;
                metrics::counter!("cache_misses_total").increment(1);
                None
            }
            None => {
                drop(entries);
                self.stats.write().misses += 1;
                metrics::counter!("cache_misses_total").increment(1);
                None
            }
        }
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value, ttl: Option<StdDuration>) {
        let now = Utc::now();
        let ttl = ttl
            .map(|d| Duration::from_std(d).unwrap_or(self.default_ttl))
            .unwrap_or(self.default_ttl);
        let size_bytes = serde_json::to_vec(&value).map(|v| v.len()).unwrap_or(0);
        let seq = self.insertion_counter.fetch_add(1, AtomicOrdering::Relaxed);

        let entry = CacheEntry {
            value,
            size_bytes,
            created_at: now,
            expires_at: now + ttl,
            hits: 0,
            last_accessed_at: now,
            insertion_seq: seq,
        };

        let mut entries = self.entries.write();
        entries.insert(key.into(), entry);
        self.evict_if_needed(&mut entries);
    }

    fn evict_if_needed(&self, entries: &mut HashMap<String, CacheEntry>) {
        loop {
            let total_size: u64 = entries.values().map(|e| e.size_bytes as u64).sum();
            let over_count = entries.len() > self.max_size;
            let over_memory = self.memory_limit_bytes > 0 && total_size > self.memory_limit_bytes;
            if !over_count && !over_memory {
                break;
            }
            match self.strategy.pick_victim(entries) {
                Some(victim) => {
                    entries.remove(&victim);
                }
                None => break,
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Glob (`*` wildcard) or plain-prefix pattern invalidation.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut entries = self.entries.write();
        let to_remove: Vec<String> = entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        for key in &to_remove {
            entries.remove(key);
        }
        to_remove.len()
    }

    pub fn warmup(&self, items: Vec<ExportedEntry>) {
        for item in items {
            let ttl = item.ttl_secs.map(|s| StdDuration::from_secs(s.max(0) as u64));
            self.set(item.key, item.value, ttl);
        }
    }

    pub fn export(&self) -> Vec<ExportedEntry> {
        let now = Utc::now();
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, e)| ExportedEntry {
                key: k.clone(),
                value: e.value.clone(),
                ttl_secs: Some((e.expires_at - now).num_seconds().max(0)),
            })
            .collect()
    }

    pub fn import(&self, items: Vec<ExportedEntry>) {
        self.warmup(items);
    }

    pub fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.remove(key);
        }
        expired.len()
    }

    pub fn get_stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let stats = self.stats.read();
        let total_size: usize = entries.values().map(|e| e.size_bytes).sum();
        let count = entries.len();
        let total_calls = stats.hits + stats.misses;
        CacheStats {
            hit_count: stats.hits,
            miss_count: stats.misses,
            hit_rate: if total_calls == 0 {
                0.0
            } else {
                stats.hits as f64 / total_calls as f64
            },
            entries: count,
            total_size_bytes: total_size,
            average_size_bytes: if count == 0 {
                0.0
            } else {
                total_size as f64 / count as f64
            },
            uptime_secs: (Utc::now() - stats.started_at).num_seconds(),
            strategy: self.strategy.name().to_string(),
        }
    }

    pub fn get_typed<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn set_typed<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl: Option<StdDuration>,
    ) -> Result<()> {
        let json = serde_json::to_value(value)?;
        self.set(key, json, ttl);
        Ok(())
    }
}

/// Minimal glob matcher supporting `*` as a multi-character wildcard; a
/// pattern with no `*` is treated as a prefix match, matching spec's
/// "glob or prefix" phrasing for `invalidatePattern`.
fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return text.starts_with(pattern);
    }
    let anchored_end = !pattern.ends_with('*');
    let segments: Vec<&str> = pattern.split('*').filter(|s| !s.is_empty()).collect();
    let mut rest = text;

    if !pattern.starts_with('*') {
        if let Some(first) = segments.first() {
            if !rest.starts_with(first) {
                return false;
            }
        }
    }

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;
        if is_last && anchored_end {
            if !rest.ends_with(segment) {
                return false;
            }
            rest = "";
        } else if let Some(pos) = rest.find(segment) {
            rest = &rest[pos + segment.len()..];
        } else {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn fabric(strategy: CacheStrategyName, max_size: usize) -> CacheFabric {
        CacheFabric::new(strategy, max_size, 0, StdDuration::from_secs(3600))
    }

    #[test]
    fn set_then_get_returns_value() {
        let cache = fabric(CacheStrategyName::Lru, 10);
        cache.set("k1", serde_json::json!({"a": 1}), None);
        assert_eq!(cache.get("k1"), Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn expired_entries_are_treated_as_misses() {
        let cache = fabric(CacheStrategyName::Lru, 10);
        cache.set("k1", serde_json::json!(1), Some(StdDuration::from_secs(0)));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(cache.get("k1"), None);
    }

    #[test]
    fn lru_evicts_least_recently_used_when_over_capacity() {
        let cache = fabric(CacheStrategyName::Lru, 2);
        cache.set("a", serde_json::json!(1), None);
        cache.set("b", serde_json::json!(2), None);
        // touch "a" so "b" becomes the least recently used
        let _ = cache.get("a");
        cache.set("c", serde_json::json!(3), None);
        assert_eq!(cache.get("b"), None);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn invalidate_pattern_supports_prefix_and_glob() {
        let cache = fabric(CacheStrategyName::Lru, 10);
        cache.set("pairing:abc", serde_json::json!(1), None);
        cache.set("pairing:def", serde_json::json!(2), None);
        cache.set("weather:xyz", serde_json::json!(3), None);

        let removed = cache.invalidate_pattern("pairing:*");
        assert_eq!(removed, 2);
        assert!(cache.get("weather:xyz").is_some());
    }

    #[test]
    fn export_then_import_round_trips_live_entries() {
        let cache = fabric(CacheStrategyName::Lru, 10);
        cache.set("k1", serde_json::json!("v1"), None);
        let exported = cache.export();

        let cache2 = fabric(CacheStrategyName::Lru, 10);
        cache2.import(exported);
        assert_eq!(cache2.get("k1"), Some(serde_json::json!("v1")));
    }

    #[test]
    fn cleanup_drops_only_expired_entries() {
        let cache = fabric(CacheStrategyName::Lru, 10);
        cache.set("fresh", serde_json::json!(1), None);
        cache.set("stale", serde_json::json!(2), Some(StdDuration::from_secs(0)));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let removed = cache.cleanup();
        assert_eq!(removed, 1);
        assert!(cache.get("fresh").is_some());
    }

    #[test]
    fn stats_reflect_hits_and_misses() {
        let cache = fabric(CacheStrategyName::Lru, 10);
        cache.set("k1", serde_json::json!(1), None);
        let _ = cache.get("k1");
        let _ = cache.get("missing");
        let stats = cache.get_stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }
}
