//! Optional LLM augmentation provider (§4.7 step 6), generalized from the
//! teacher's thin external-integration client shape
//! (`integrations::edge_agent::EdgeAgentClient`) into a trait so a real
//! provider and a test double share one seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Wine;
use crate::error::Result;
use crate::pairing::dish::Dish;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmScore {
    pub wine_id: uuid::Uuid,
    pub score: f64,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Scores each candidate against the dish, in `[0, 1]`. Providers should
    /// return an error (never panic) on timeout or upstream failure; the
    /// caller degrades silently to traditional scoring unless `force_ai` is
    /// set.
    async fn score_candidates(&self, dish: &Dish, candidates: &[Wine]) -> Result<Vec<LlmScore>>;
}

/// A deterministic stand-in used in tests and when no real provider is
/// configured but AI scoring is still exercised.
pub struct NullLlmProvider;

#[async_trait]
impl LlmProvider for NullLlmProvider {
    async fn score_candidates(&self, _dish: &Dish, _candidates: &[Wine]) -> Result<Vec<LlmScore>> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_returns_no_scores() {
        let dish = Dish {
            name: "salmon".to_string(),
            cuisine: None,
            preparation: None,
            intensity: None,
            dominant_flavors: vec![],
            texture: None,
            season: None,
        };
        let scores = NullLlmProvider.score_candidates(&dish, &[]).await.unwrap();
        assert!(scores.is_empty());
    }
}
