//! Real User Monitoring ingestion buffer (§8 Open Questions: "The RUM
//! ingestion path uses in-memory maps with a 24 h retention; whether the
//! production-grade core should persist this to durable storage is
//! explicitly out of scope here"). Resolved in [`DESIGN.md`](../../DESIGN.md)
//! as in-memory-only for this core: a durable RUM store is a distinct
//! subsystem a collaborator can add without touching this buffer's API.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

const RETENTION: i64 = 24;

/// One client-reported sample: a named metric (e.g. `"largest_contentful_paint"`),
/// its value, the page/route it was observed on, and free-form context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RumMetric {
    pub name: String,
    pub value: f64,
    pub page: String,
    pub session_id: String,
    pub recorded_at: DateTime<Utc>,
    pub context: serde_json::Value,
}

/// Bounded-by-time in-memory store, keyed by metric name. Entries older
/// than 24h are dropped lazily on the next [`RumBuffer::record`] or
/// [`RumBuffer::summarize`] call rather than on a timer, mirroring the cache
/// fabric's own lazy-expiry style (see `crate::cache::fabric::CacheEntry::is_expired`).
pub struct RumBuffer {
    by_metric: RwLock<HashMap<String, Vec<RumMetric>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RumSummary {
    pub metric: String,
    pub count: usize,
    pub p50: f64,
    pub p95: f64,
    pub max: f64,
}

impl RumBuffer {
    pub fn new() -> Self {
        Self { by_metric: RwLock::new(HashMap::new()) }
    }

    pub fn record(&self, metric: RumMetric) {
        let cutoff = Utc::now() - Duration::hours(RETENTION);
        let mut guard = self.by_metric.write();
        let bucket = guard.entry(metric.name.clone()).or_default();
        bucket.retain(|m| m.recorded_at >= cutoff);
        bucket.push(metric);
    }

    /// Percentile summaries over whatever samples remain within the
    /// retention window for `metric_name`. Returns `None` if nothing has
    /// been recorded (or everything aged out).
    pub fn summarize(&self, metric_name: &str) -> Option<RumSummary> {
        let cutoff = Utc::now() - Duration::hours(RETENTION);
        let mut guard = self.by_metric.write();
        let bucket = guard.get_mut(metric_name)?;
        bucket.retain(|m| m.recorded_at >= cutoff);
        if bucket.is_empty() {
            return None;
        }

        let mut values: Vec<f64> = bucket.iter().map(|m| m.value).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let percentile = |p: f64| -> f64 {
            let idx = ((values.len() - 1) as f64 * p).round() as usize;
            values[idx]
        };

        Some(RumSummary {
            metric: metric_name.to_string(),
            count: values.len(),
            p50: percentile(0.50),
            p95: percentile(0.95),
            max: *values.last().unwrap(),
        })
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.by_metric.read().keys().cloned().collect()
    }
}

impl Default for RumBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64, age_hours: i64) -> RumMetric {
        RumMetric {
            name: "lcp".to_string(),
            value,
            page: "/cellar".to_string(),
            session_id: "sess-1".to_string(),
            recorded_at: Utc::now() - Duration::hours(age_hours),
            context: serde_json::json!({}),
        }
    }

    #[test]
    fn summarize_computes_percentiles_over_recent_samples() {
        let buffer = RumBuffer::new();
        for v in [100.0, 200.0, 300.0, 400.0, 500.0] {
            buffer.record(sample(v, 0));
        }
        let summary = buffer.summarize("lcp").unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.max, 500.0);
    }

    #[test]
    fn entries_older_than_retention_are_excluded() {
        let buffer = RumBuffer::new();
        buffer.record(sample(999.0, 25));
        buffer.record(sample(10.0, 1));
        let summary = buffer.summarize("lcp").unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.max, 10.0);
    }

    #[test]
    fn unknown_metric_summarizes_to_none() {
        let buffer = RumBuffer::new();
        assert!(buffer.summarize("nonexistent").is_none());
    }
}
