use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sub-scores in `[0, 1]` computed for a candidate wine (§4.7 step 5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubScores {
    pub style_match: f64,
    pub flavor_harmony: f64,
    pub texture_balance: f64,
    pub regional_tradition: f64,
    pub seasonal_appropriateness: f64,
    /// Present only when AI augmentation ran.
    pub ai_score: Option<f64>,
}

impl SubScores {
    pub fn values(&self) -> [f64; 5] {
        [
            self.style_match,
            self.flavor_harmony,
            self.texture_balance,
            self.regional_tradition,
            self.seasonal_appropriateness,
        ]
    }
}

/// A produced pairing recommendation (§3). `id` is the persisted row
/// identity that feedback and downstream analysis reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingRecommendation {
    pub id: Uuid,
    pub wine_id: Uuid,
    pub sub_scores: SubScores,
    pub total: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub ai_enhanced: bool,
    pub session_id: Uuid,
    pub ordinal: u32,
}
