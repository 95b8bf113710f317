//! Vintage Intelligence (spec §4.4): composes the persistence layer, the
//! cache fabric's in-memory memo, and the weather fetcher to produce a
//! per-vintage weather analysis, a quality-adjusted score, a procurement
//! recommendation, and pairing insights.

mod memo;
mod procurement;
mod quality;
mod region;
mod summary;

pub use memo::VintageMemo;
pub use procurement::{ProcurementAction, ProcurementPriority, ProcurementRecommendation};
pub use region::normalize_region;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Vintage, Wine, WeatherAnalysis};
use crate::error::Result;
use crate::storage::repository::VintageRepository;
use crate::weather::WeatherFetcher;

/// Result of `enrichWineData` (§4.4): returned to the caller even when the
/// persistence step fails (enrichment is best-effort atop inventory
/// operations).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub weather_analysis: Option<WeatherAnalysis>,
    pub vintage_summary: String,
    pub quality_score: f64,
    pub procurement_rec: ProcurementRecommendation,
    pub enriched_at: chrono::DateTime<Utc>,
    /// Set when persisting the enrichment failed; the caller still gets the
    /// enrichment itself (§4.4 step 7, §4.6 `enrichmentError`).
    pub persistence_error: Option<String>,
}

pub struct VintageIntelligence {
    vintages: Arc<VintageRepository>,
    weather: Arc<dyn WeatherFetcher>,
    memo: Arc<VintageMemo>,
}

impl VintageIntelligence {
    pub fn new(vintages: Arc<VintageRepository>, weather: Arc<dyn WeatherFetcher>, memo: Arc<VintageMemo>) -> Self {
        Self { vintages, weather, memo }
    }

    /// §4.4: the full enrichment pipeline. Never fails the caller even if
    /// the weather fetch, scoring, or persistence step runs into trouble —
    /// those degrade to `None`/logged errors per §7.
    pub async fn enrich_wine_data(&self, wine: &Wine, vintage: &Vintage) -> Result<EnrichmentResult> {
        let region_token = normalize_region(&wine.region);
        let memo_key = format!("{region_token}_{}", vintage.year);

        if let Some(cached) = self.memo.get(&memo_key) {
            return Ok(cached);
        }

        let weather_analysis = self
            .weather
            .fetch(&region_token, vintage.year, None)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "weather fetch failed during enrichment, degrading to base score");
                None
            });

        let base_score = vintage.critic_score.or(vintage.quality_score).unwrap_or(75.0);
        let quality_score = match &weather_analysis {
            Some(analysis) => quality::weather_adjusted_quality(base_score, analysis),
            None => base_score.clamp(50.0, 100.0),
        };

        let vintage_summary = match &weather_analysis {
            Some(analysis) => summary::generate_summary(analysis, &wine.producer, vintage.year),
            None => format!(
                "{} {} {}: limited weather data available; scored from critic/base data alone.",
                vintage.year, wine.producer, wine.region
            ),
        };

        let procurement_rec = match &weather_analysis {
            Some(analysis) => procurement::recommend(analysis),
            None => procurement::ProcurementRecommendation {
                action: ProcurementAction::Hold,
                priority: ProcurementPriority::Low,
                reasoning: "Insufficient weather data to recommend a procurement action confidently."
                    .to_string(),
                suggested_quantity: "Standard".to_string(),
                considerations: vec![],
            },
        };

        let result = EnrichmentResult {
            weather_analysis,
            vintage_summary,
            quality_score,
            procurement_rec,
            enriched_at: Utc::now(),
            persistence_error: None,
        };

        self.memo.insert(memo_key.clone(), result.clone());

        let mut result = result;
        if let Err(err) = self.persist(vintage.id, &result).await {
            warn!(error = %err, vintage_id = %vintage.id, "failed to persist vintage enrichment");
            result.persistence_error = Some(err.to_string());
        }

        Ok(result)
    }

    async fn persist(&self, vintage_id: Uuid, result: &EnrichmentResult) -> Result<()> {
        let weather_json = serde_json::to_value(&result.weather_analysis)?;
        let procurement_json = serde_json::to_value(&result.procurement_rec)?;
        let weather_score = result
            .weather_analysis
            .as_ref()
            .map(|a| a.overall_score)
            .unwrap_or(result.quality_score);
        self.vintages
            .update_enrichment(vintage_id, result.quality_score, weather_score, &weather_json, &procurement_json)
            .await
    }

    /// Explicit memo invalidation (Open Question resolution in SPEC_FULL.md:
    /// the memo is unbounded until explicitly refreshed).
    pub fn invalidate_memo(&self, region: &str, year: i32) {
        let region_token = normalize_region(region);
        self.memo.remove(&format!("{region_token}_{year}"));
    }

    /// `generateWeatherPairingInsight` (§4.4): a short textual insight
    /// combining the strongest applicable factor, or `None` if none
    /// applies.
    pub fn generate_weather_pairing_insight(analysis: &WeatherAnalysis, dish_intensity: &str) -> Option<String> {
        let rich_dish = matches!(dish_intensity, "rich" | "bold" | "heavy");
        if analysis.acidity >= 4.0 && rich_dish {
            return Some(
                "This vintage's bright acidity, built up by a long, temperate growing season, cuts nicely through rich dishes.".to_string(),
            );
        }
        if analysis.ripeness >= 4.0 && rich_dish {
            return Some(
                "Ripe, concentrated fruit from a warm vintage stands up well to bold, intensely flavored dishes.".to_string(),
            );
        }
        if analysis.diurnal_range_avg_c > 12.0 {
            return Some(
                "Large swings between day and night temperatures preserved freshness and structure in this vintage.".to_string(),
            );
        }
        if analysis.overall_score >= 88.0 {
            return Some("An exceptional growing season produced a vintage with unusual depth and balance.".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherConfidence;

    fn sample_analysis() -> WeatherAnalysis {
        WeatherAnalysis {
            region_token: "bordeaux".to_string(),
            vineyard_alias: None,
            year: 2015,
            mean_temp_c: 18.0,
            max_temp_c: 30.0,
            min_temp_c: 8.0,
            gdd: 1400.0,
            total_rainfall_mm: 450.0,
            heatwave_days: 3,
            frost_days: 0,
            sunshine_hours: 1800.0,
            diurnal_range_avg_c: 14.0,
            overall_score: 90.0,
            confidence: WeatherConfidence::High,
            ripeness: 4.6,
            acidity: 4.7,
            disease_pressure: 1.5,
            sample_completeness: 0.95,
        }
    }

    #[test]
    fn pairing_insight_favors_acidity_for_rich_dishes() {
        let analysis = sample_analysis();
        let insight = VintageIntelligence::generate_weather_pairing_insight(&analysis, "rich");
        assert!(insight.is_some());
        assert!(insight.unwrap().contains("acidity"));
    }

    #[test]
    fn pairing_insight_is_none_when_nothing_applies() {
        let mut analysis = sample_analysis();
        analysis.acidity = 2.0;
        analysis.ripeness = 2.0;
        analysis.diurnal_range_avg_c = 5.0;
        analysis.overall_score = 70.0;
        assert!(VintageIntelligence::generate_weather_pairing_insight(&analysis, "light").is_none());
    }
}
