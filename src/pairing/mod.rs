//! Pairing Engine (spec §4.7): traditional scoring, preference filtering,
//! optional LLM augmentation, response cache keyed by fingerprint,
//! explanation emission, and a hook back into Learning for sub-score
//! weights.

mod dish;
mod llm;
mod scoring;
mod ttl;

pub use dish::Dish;
pub use llm::{LlmProvider, LlmScore, NullLlmProvider};
pub use scoring::ScoreWeights;
pub use ttl::{resolve_ttl, TtlInputs};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::cache::{canonical_fingerprint, CacheFabric};
use crate::domain::{Explanation, ExplanationEntityType, PairingRecommendation, Wine};
use crate::error::{CellarError, Result};
use crate::storage::repository::{ExplanationRepository, PairingSessionRepository, WineRepository};
use crate::storage::Db;

/// Supplies sub-score weights derived by the Learning component (§4.8).
/// Decouples Pairing from Learning's concrete implementation.
pub trait PairingWeightsSource: Send + Sync {
    fn weights(&self) -> Option<ScoreWeights>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestPreferences {
    pub preferred_types: Vec<String>,
    pub avoided_types: Vec<String>,
    pub preferred_regions: Vec<String>,
    pub dietary_restrictions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairingContext {
    pub occasion: Option<String>,
    pub special_occasion: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairingOptions {
    pub max_recommendations: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub force_ai: bool,
    pub include_reasoning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingResult {
    pub recommendations: Vec<PairingRecommendation>,
    pub explanation: String,
    pub cached: bool,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

pub struct PairingEngine {
    wines: Arc<WineRepository>,
    db: Arc<Db>,
    sessions: Arc<PairingSessionRepository>,
    explanations: Arc<ExplanationRepository>,
    cache: Arc<CacheFabric>,
    llm: Option<Arc<dyn LlmProvider>>,
    weights_source: Option<Arc<dyn PairingWeightsSource>>,
    disable_external_calls: bool,
}

impl PairingEngine {
    pub fn new(
        wines: Arc<WineRepository>,
        db: Arc<Db>,
        sessions: Arc<PairingSessionRepository>,
        explanations: Arc<ExplanationRepository>,
        cache: Arc<CacheFabric>,
        llm: Option<Arc<dyn LlmProvider>>,
        weights_source: Option<Arc<dyn PairingWeightsSource>>,
        disable_external_calls: bool,
    ) -> Self {
        Self { wines, db, sessions, explanations, cache, llm, weights_source, disable_external_calls }
    }

    /// `generatePairings` (§4.7): the full scoring pipeline.
    pub async fn generate_pairings(
        &self,
        dish_input: &str,
        context: PairingContext,
        preferences: GuestPreferences,
        options: PairingOptions,
    ) -> Result<PairingResult> {
        self.run(dish_input, context, preferences, options, false).await
    }

    /// `quickPairing` (§4.7): identical pipeline with AI disabled and a
    /// smaller candidate pool, tagged `quick: true` in its cache key.
    pub async fn quick_pairing(
        &self,
        dish_input: &str,
        context: PairingContext,
        preferences: GuestPreferences,
        mut options: PairingOptions,
    ) -> Result<PairingResult> {
        options.force_ai = false;
        self.run(dish_input, context, preferences, options, true).await
    }

    async fn run(
        &self,
        dish_input: &str,
        context: PairingContext,
        preferences: GuestPreferences,
        options: PairingOptions,
        quick: bool,
    ) -> Result<PairingResult> {
        let dish_name = dish::require_dish_name(dish_input)?;
        let dish = dish::parse_free_text(&dish_name);

        let dish_json = serde_json::to_value(&dish)?;
        let context_json = serde_json::to_value(&context)?;
        let preferences_json = serde_json::to_value(&preferences)?;

        let mut fingerprint_payload = serde_json::json!({
            "dish": dish_json,
            "context": context_json,
            "preferences": preferences_json,
        });
        if quick {
            fingerprint_payload["quick"] = serde_json::Value::Bool(true);
        }
        let cache_key = canonical_fingerprint("pairing", &fingerprint_payload);

        if let Ok(Some(cached)) = self.cache.get_typed::<PairingResult>(&cache_key) {
            let mut cached = cached;
            cached.cached = true;
            return Ok(cached);
        }

        let region_filter = preferences.preferred_regions.first().map(|s| s.as_str());
        let mut candidates = self.wines.list_available(region_filter, None).await?;

        candidates.retain(|wine| !preferences.avoided_types.iter().any(|t| t.eq_ignore_ascii_case(wine.wine_type.as_str())));
        if !preferences.preferred_regions.is_empty() {
            candidates.retain(|wine| preferences.preferred_regions.iter().any(|r| r.eq_ignore_ascii_case(&wine.region)));
        }

        if quick && candidates.len() > 10 {
            candidates.truncate(10);
        }

        if candidates.is_empty() {
            return Err(CellarError::not_found("no candidate wines available for pairing"));
        }

        let weights = self.weights_source.as_ref().and_then(|s| s.weights()).unwrap_or_default();

        let mut scored: Vec<(Wine, PairingRecommendation)> = candidates
            .into_iter()
            .map(|wine| {
                let sub_scores = scoring::compute_sub_scores(&wine, &dish);
                let total = scoring::composite(&sub_scores, weights);
                let confidence = scoring::confidence(&sub_scores);
                let rec = PairingRecommendation {
                    id: Uuid::new_v4(),
                    wine_id: wine.id,
                    sub_scores,
                    total,
                    confidence,
                    reasoning: String::new(),
                    ai_enhanced: false,
                    session_id: Uuid::nil(),
                    ordinal: 0,
                };
                (wine, rec)
            })
            .collect();

        let mut ai_enhanced = false;
        if !quick {
            if let Some(llm) = &self.llm {
                if !self.disable_external_calls {
                    let top_candidates: Vec<Wine> = scored.iter().map(|(w, _)| w.clone()).collect();
                    match llm.score_candidates(&dish, &top_candidates).await {
                        Ok(ai_scores) => {
                            for (wine, rec) in scored.iter_mut() {
                                if let Some(ai_score) = ai_scores.iter().find(|s| s.wine_id == wine.id) {
                                    rec.sub_scores.ai_score = Some(ai_score.score);
                                    rec.total = scoring::composite(&rec.sub_scores, weights);
                                    rec.ai_enhanced = true;
                                    ai_enhanced = true;
                                }
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "LLM augmentation failed, degrading to traditional scoring");
                            if options.force_ai {
                                return Err(CellarError::AiNotConfigured(
                                    "forceAI requested but the LLM provider failed".to_string(),
                                ));
                            }
                        }
                    }
                } else if options.force_ai {
                    return Err(CellarError::AiNotConfigured(
                        "forceAI requested but external calls are disabled".to_string(),
                    ));
                }
            } else if options.force_ai {
                return Err(CellarError::AiNotConfigured("no LLM provider configured".to_string()));
            }
        }

        scored.sort_by(|a, b| b.1.total.partial_cmp(&a.1.total).unwrap_or(std::cmp::Ordering::Equal));

        let threshold = options.confidence_threshold.unwrap_or(0.0);
        let max_recommendations = options.max_recommendations.unwrap_or(5);

        let session_id = Uuid::new_v4();
        let mut recommendations: Vec<PairingRecommendation> = scored
            .into_iter()
            .filter(|(_, rec)| rec.confidence >= threshold)
            .take(max_recommendations)
            .enumerate()
            .map(|(idx, (wine, mut rec))| {
                rec.session_id = session_id;
                rec.ordinal = idx as u32;
                rec.reasoning = build_reasoning(&wine, &dish, &rec);
                rec
            })
            .collect();

        if recommendations.is_empty() {
            return Err(CellarError::not_found("no recommendations met the confidence threshold"));
        }

        let explanation_summary = build_session_explanation(&dish, &recommendations);

        let dietary_count = preferences.dietary_restrictions.len();
        let special_occasion = context.special_occasion;

        let session_id_copy = session_id;
        let sessions = Arc::clone(&self.sessions);
        let explanations_repo = Arc::clone(&self.explanations);
        let dish_json_tx = dish_json.clone();
        let context_json_tx = context_json.clone();
        let preferences_json_tx = preferences_json.clone();
        let cache_key_tx = cache_key.clone();
        let recommendations_tx = recommendations.clone();
        let explanation_summary_tx = explanation_summary.clone();

        self.db
            .with_transaction(move |tx| {
                let sessions = Arc::clone(&sessions);
                let explanations_repo = Arc::clone(&explanations_repo);
                let dish_json = dish_json_tx.clone();
                let context_json = context_json_tx.clone();
                let preferences_json = preferences_json_tx.clone();
                let cache_key = cache_key_tx.clone();
                let recommendations = recommendations_tx.clone();
                let explanation_summary = explanation_summary_tx.clone();
                Box::pin(async move {
                    sessions
                        .persist_session(
                            tx,
                            session_id_copy,
                            &dish_json,
                            &context_json,
                            &preferences_json,
                            &cache_key,
                            ai_enhanced,
                            quick,
                            &recommendations,
                        )
                        .await?;

                    for rec in &recommendations {
                        let explanation = Explanation::new(
                            ExplanationEntityType::PairingRecommendation,
                            rec.id.to_string(),
                            explanation_summary.clone(),
                            rec.top_factors(),
                            "system",
                        );
                        explanations_repo.append_in_tx(tx, &explanation).await?;
                    }
                    Ok(())
                })
            })
            .await?;

        if !options.include_reasoning {
            for rec in recommendations.iter_mut() {
                rec.reasoning.clear();
            }
        }

        let ttl = resolve_ttl(TtlInputs {
            ai_enhanced,
            special_occasion,
            dietary_restriction_count: dietary_count,
            seasonal_context: dish.season.is_some(),
        });

        let result = PairingResult {
            recommendations,
            explanation: explanation_summary,
            cached: false,
            generated_at: chrono::Utc::now(),
        };

        if let Err(err) = self.cache.set_typed(&cache_key, &result, Some(ttl)) {
            warn!(error = %err, "failed to write pairing result to cache");
        }

        Ok(result)
    }
}

impl PairingRecommendation {
    fn top_factors(&self) -> Vec<String> {
        let mut factors = vec![
            format!("style_match={:.2}", self.sub_scores.style_match),
            format!("flavor_harmony={:.2}", self.sub_scores.flavor_harmony),
        ];
        if let Some(ai) = self.sub_scores.ai_score {
            factors.push(format!("ai_score={ai:.2}"));
        }
        factors
    }
}

fn build_reasoning(wine: &Wine, dish: &Dish, rec: &PairingRecommendation) -> String {
    format!(
        "{} pairs with {} on style match ({:.0}%) and flavor harmony ({:.0}%).",
        wine.name,
        dish.name,
        rec.sub_scores.style_match * 100.0,
        rec.sub_scores.flavor_harmony * 100.0
    )
}

fn build_session_explanation(dish: &Dish, recommendations: &[PairingRecommendation]) -> String {
    format!(
        "Generated {} recommendation(s) for \"{}\", ranked by style match, flavor harmony, and regional tradition.",
        recommendations.len(),
        dish.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WineType;

    #[test]
    fn recommendation_top_factors_includes_ai_score_when_present() {
        let rec = PairingRecommendation {
            id: Uuid::new_v4(),
            wine_id: Uuid::new_v4(),
            sub_scores: crate::domain::SubScores {
                style_match: 0.8,
                flavor_harmony: 0.7,
                texture_balance: 0.6,
                regional_tradition: 0.5,
                seasonal_appropriateness: 0.5,
                ai_score: Some(0.9),
            },
            total: 0.8,
            confidence: 0.9,
            reasoning: String::new(),
            ai_enhanced: true,
            session_id: Uuid::new_v4(),
            ordinal: 0,
        };
        let factors = rec.top_factors();
        assert!(factors.iter().any(|f| f.starts_with("ai_score")));
    }

    #[test]
    fn build_reasoning_names_the_wine_and_dish() {
        let wine = Wine::new("Cuvee Prestige", "Domaine Example", "Burgundy", "France", WineType::Red);
        let dish = dish::parse_free_text("grilled steak");
        let rec = PairingRecommendation {
            id: Uuid::new_v4(),
            wine_id: wine.id,
            sub_scores: crate::domain::SubScores {
                style_match: 0.9,
                flavor_harmony: 0.8,
                texture_balance: 0.7,
                regional_tradition: 0.6,
                seasonal_appropriateness: 0.5,
                ai_score: None,
            },
            total: 0.8,
            confidence: 0.9,
            reasoning: String::new(),
            ai_enhanced: false,
            session_id: Uuid::new_v4(),
            ordinal: 0,
        };
        let reasoning = build_reasoning(&wine, &dish, &rec);
        assert!(reasoning.contains("Cuvee Prestige"));
        assert!(reasoning.contains("grilled steak"));
    }
}
