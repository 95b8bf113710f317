//! `processedVintages` in-memory memo (§4.4 step 2), keyed
//! `normalizedRegion_year`. Implemented as an unbounded-until-explicit-
//! refresh map per the Open Question resolution in SPEC_FULL.md.

use dashmap::DashMap;

use super::EnrichmentResult;

#[derive(Default)]
pub struct VintageMemo {
    inner: DashMap<String, EnrichmentResult>,
}

impl VintageMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<EnrichmentResult> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: String, value: EnrichmentResult) {
        self.inner.insert(key, value);
    }

    pub fn remove(&self, key: &str) {
        self.inner.remove(key);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vintage_intelligence::{ProcurementAction, ProcurementPriority, ProcurementRecommendation};
    use chrono::Utc;

    fn sample() -> EnrichmentResult {
        EnrichmentResult {
            weather_analysis: None,
            vintage_summary: "test".to_string(),
            quality_score: 80.0,
            procurement_rec: ProcurementRecommendation {
                action: ProcurementAction::Hold,
                priority: ProcurementPriority::Medium,
                reasoning: "test".to_string(),
                suggested_quantity: "Standard".to_string(),
                considerations: vec![],
            },
            enriched_at: Utc::now(),
            persistence_error: None,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let memo = VintageMemo::new();
        memo.insert("bordeaux_2015".to_string(), sample());
        assert!(memo.get("bordeaux_2015").is_some());
        assert!(memo.get("napa_2015").is_none());
    }

    #[test]
    fn remove_clears_the_entry() {
        let memo = VintageMemo::new();
        memo.insert("bordeaux_2015".to_string(), sample());
        memo.remove("bordeaux_2015");
        assert!(memo.get("bordeaux_2015").is_none());
    }
}
